//! Session and bridge error types.

use sedap_protocol::ProtocolError;
use thiserror::Error;

/// Failure of a [`crate::SessionPort`] request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session is gone; no response will ever arrive.
    #[error("session closed")]
    Closed,

    /// The session answered with a failure.
    #[error("request '{command}' rejected: {message}")]
    Rejected {
        /// Request name.
        command: String,
        /// Reason given by the session.
        message: String,
    },

    /// The port gave up waiting.
    #[error("request '{command}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Request name.
        command: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure while handling one panel request.
///
/// Never sent to the panel: the inbound loop logs it and moves on.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The session request failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session result did not match its documented shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An execution-control request resolved to nothing.
    #[error("request '{request}' returned no result")]
    MissingResult {
        /// Request name.
        request: &'static str,
    },

    /// Request arguments could not be encoded.
    #[error("failed to encode arguments for '{request}': {source}")]
    Encode {
        /// Request name.
        request: &'static str,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rejected_display() {
        let err = SessionError::Rejected {
            command: "jump".into(),
            message: "bad id".into(),
        };
        assert_eq!(err.to_string(), "request 'jump' rejected: bad id");
    }

    #[test]
    fn timeout_display() {
        let err = SessionError::Timeout {
            command: "debuggerState".into(),
            timeout_ms: 500,
        };
        assert_eq!(
            err.to_string(),
            "request 'debuggerState' timed out after 500 ms"
        );
    }

    #[test]
    fn session_error_converts_transparently() {
        let err: BridgeError = SessionError::Closed.into();
        assert_eq!(err.to_string(), "session closed");
        assert_matches!(err, BridgeError::Session(SessionError::Closed));
    }

    #[test]
    fn missing_result_display() {
        let err = BridgeError::MissingResult { request: "startProc" };
        assert_eq!(err.to_string(), "request 'startProc' returned no result");
    }
}
