//! Crate-level error types.
//!
//! `ProtocolError` covers a single inbound frame that could not be turned
//! into a local event; those are logged and dropped. `ChatError` covers
//! failures that end the session.

use thiserror::Error;

/// Why an inbound frame was dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON.
    #[error("malformed JSON frame: {0}")]
    MalformedJson(#[source] serde_json::Error),
    /// The frame parsed but carries no string `message_type`.
    #[error("envelope has no message_type field")]
    MissingMessageType,
    /// A `response-tokens` envelope did not decode as a response chunk.
    #[error("invalid response chunk: {0}")]
    InvalidChunk(#[source] serde_json::Error),
}

/// Session-level failures. Frame-level [`ProtocolError`]s never reach this
/// type; they are logged and dropped where they occur.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("WebSocket connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize outgoing message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("config file {path}: {detail}")]
    Config { path: String, detail: String },
}
