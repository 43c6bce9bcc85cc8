//! Error types for chatsync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding channel events.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Payload could not be encoded as JSON
    #[error("serialization failed for {event}: {source}")]
    Serialization {
        /// Event whose payload failed to encode
        event: &'static str,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Payload did not match the shape expected for the event
    #[error("malformed {event} payload: {source}")]
    Deserialization {
        /// Event whose payload failed to decode
        event: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// Inbound event name is not part of the protocol
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}
