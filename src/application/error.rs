// Relay error taxonomy
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to encode outbound frame: {0}")]
    Encode(serde_json::Error),

    #[error("payload has no message type")]
    MissingKind,

    #[error("unsupported message type: {0}")]
    UnsupportedKind(String),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure to hand a message to a single connection.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,

    #[error("connection send queue is full")]
    QueueFull,
}
