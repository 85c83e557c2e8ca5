//! Error types for the Seance client.

use thiserror::Error;

/// Errors that can occur when using the Seance client.
#[derive(Debug, Error)]
pub enum SeanceError {
    /// The transport could not deliver an outbound message.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// The transport failed while waiting for the next message.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport was used after it had been closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// A protocol message could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an action that requires an open connection, but the client is not connected.
    /// Nothing is queued or retried; the action is dropped.
    #[error("not connected to server")]
    NotConnected,

    /// A required action payload was empty (chat text, whisper target, room or ability name).
    #[error("empty {field}: nothing sent")]
    EmptyPayload {
        /// Which payload field was empty.
        field: &'static str,
    },

    /// A narrative choice was selected that is not currently offered
    /// (no beat is presented, or the label is not in the offered set).
    #[error("choice {label:?} is not currently offered")]
    ChoiceUnavailable {
        /// The label that was selected.
        label: String,
    },

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Seance client operations.
pub type Result<T> = std::result::Result<T, SeanceError>;
