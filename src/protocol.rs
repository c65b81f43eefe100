//! Wire types exchanged with the chat server, plus frame decoding.
//!
//! Outbound: one JSON text frame per user submission,
//! `{"queryId": .., "message": .., "timestamp": ..}`.
//!
//! Inbound: JSON envelopes discriminated by `message_type`. Everything
//! beyond that field is server-defined and kept as a raw `serde_json::Value`
//! until a handler asks for a typed view (see [`InboundEvent::chunk`]).

use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ChatError, ProtocolError};
use crate::events::{InboundEvent, LocalEvent, MessageType};

/// Client-generated identifier correlating a submission with its response.
pub type QueryId = String;

/// Current Unix epoch in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Fresh, session-unique query id (UUID v4, hyphenated).
pub fn new_query_id() -> QueryId {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A user submission as sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub query_id: QueryId,
    pub message: String,
    pub timestamp: u64,
}

impl OutgoingMessage {
    /// Stamp `message` with a new query id and the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            query_id: new_query_id(),
            message: message.into(),
            timestamp: now_ms(),
        }
    }

    /// Serialize to the JSON text written to the socket.
    pub fn to_wire(&self) -> Result<String, ChatError> {
        serde_json::to_string(self).map_err(ChatError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One increment of a streamed response.
///
/// The server's own record names the id `queryUuid`; both spellings are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseChunk {
    #[serde(alias = "queryUuid")]
    pub query_id: QueryId,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<String>,
}

/// `isComplete` may be absent or `null`; both mean "not yet".
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl ResponseChunk {
    /// The text fragment carried by this chunk, if any. Empty strings count
    /// as no fragment.
    pub fn fragment(&self) -> Option<&str> {
        self.tokens.as_deref().filter(|t| !t.is_empty())
    }
}

/// Decode one inbound text frame into a local event.
///
/// The envelope is kept whole; `message_type` only selects the event kind.
pub fn decode_frame(text: &str, received_at: u64) -> Result<LocalEvent, ProtocolError> {
    let message: serde_json::Value =
        serde_json::from_str(text).map_err(ProtocolError::MalformedJson)?;
    let kind = message
        .get("message_type")
        .and_then(|v| v.as_str())
        .map(MessageType::parse)
        .ok_or(ProtocolError::MissingMessageType)?;
    Ok(LocalEvent::Received(InboundEvent {
        kind,
        message,
        timestamp: received_at,
    }))
}
