//! `Content-Length` framing.
//!
//! A frame is a header block terminated by `\r\n\r\n` followed by exactly
//! `Content-Length` bytes of JSON. Headers other than `Content-Length` are
//! ignored. A frame whose body is not a valid envelope is skipped with a
//! warning; the stream continues with the next frame.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::errors::CodecError;
use crate::message::ProtocolMessage;

const HEADER_END: &[u8] = b"\r\n\r\n";
const MAX_HEADER_LEN: usize = 8 * 1024;
/// Default body limit.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Encoder and decoder for DAP frames.
#[derive(Debug)]
pub struct DapCodec {
    max_frame: usize,
    /// Body length of a frame whose header has been consumed.
    pending_len: Option<usize>,
}

impl DapCodec {
    /// Codec with the default frame limit.
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Codec rejecting bodies longer than `max_frame` bytes.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame,
            pending_len: None,
        }
    }

    fn take_header(&mut self, src: &mut BytesMut) -> Result<Option<usize>, CodecError> {
        let Some(end) = src.windows(HEADER_END.len()).position(|w| w == HEADER_END) else {
            if src.len() > MAX_HEADER_LEN {
                return Err(CodecError::HeaderTooLarge {
                    max: MAX_HEADER_LEN,
                });
            }
            return Ok(None);
        };
        let header = src.split_to(end + HEADER_END.len());
        let len = parse_content_length(&header[..end])?;
        if len > self.max_frame {
            return Err(CodecError::FrameTooLarge {
                len,
                max: self.max_frame,
            });
        }
        Ok(Some(len))
    }
}

impl Default for DapCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `Content-Length` from a header block (without its terminator).
pub fn parse_content_length(header: &[u8]) -> Result<usize, CodecError> {
    let text = std::str::from_utf8(header).map_err(|_| CodecError::InvalidHeader)?;
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            return value
                .parse()
                .map_err(|_| CodecError::InvalidContentLength(value.to_owned()));
        }
    }
    Err(CodecError::MissingContentLength)
}

impl Decoder for DapCodec {
    type Item = ProtocolMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let len = match self.pending_len {
                Some(len) => len,
                None => match self.take_header(src)? {
                    Some(len) => {
                        self.pending_len = Some(len);
                        len
                    }
                    None => return Ok(None),
                },
            };
            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }
            self.pending_len = None;
            let body = src.split_to(len);
            match serde_json::from_slice(&body) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => warn!(error = %e, len, "skipping undecodable frame"),
            }
        }
    }
}

impl Encoder<ProtocolMessage> for DapCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ProtocolMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item).map_err(CodecError::Encode)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        dst.reserve(header.len() + body.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}
