//! Framing errors.

use thiserror::Error;

/// Failure to read or write a DAP frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Header block is not valid UTF-8.
    #[error("header is not valid UTF-8")]
    InvalidHeader,

    /// Header block has no `Content-Length`.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// `Content-Length` is not a number.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// Header block grew past the limit without terminating.
    #[error("header exceeds {max} bytes")]
    HeaderTooLarge {
        /// Limit in bytes.
        max: usize,
    },

    /// Declared body length is over the limit.
    #[error("frame of {len} bytes exceeds {max} bytes")]
    FrameTooLarge {
        /// Declared length.
        len: usize,
        /// Limit in bytes.
        max: usize,
    },

    /// An outgoing message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(
            CodecError::InvalidContentLength("abc".into()).to_string(),
            "invalid Content-Length: \"abc\""
        );
        assert_eq!(
            CodecError::FrameTooLarge { len: 10, max: 5 }.to_string(),
            "frame of 10 bytes exceeds 5 bytes"
        );
    }
}
