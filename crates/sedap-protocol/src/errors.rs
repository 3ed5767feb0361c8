//! Protocol decoding errors.

use thiserror::Error;

/// A message or event body that does not match the schema.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A UI frame could not be decoded as a [`crate::UiMessage`].
    #[error("invalid ui message: {0}")]
    InvalidUiMessage(#[source] serde_json::Error),

    /// A custom event body did not have the shape its name requires.
    #[error("invalid body for custom event '{event}': {source}")]
    InvalidEventBody {
        /// Event name.
        event: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// A custom request result did not have its documented shape.
    #[error("invalid result for request '{request}': {source}")]
    InvalidResult {
        /// Request name.
        request: &'static str,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}
