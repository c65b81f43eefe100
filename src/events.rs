//! Local (in-process) events flowing between the input, transport and view.
//!
//! Event names are derived from the [`MessageType`] variant, never built
//! ad hoc from strings at the dispatch site.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::protocol::{OutgoingMessage, ResponseChunk};

/// Name of the event emitted for every user submission.
pub const USER_TALKED: &str = "user-talked";

/// Suffix appended to an inbound message type to form its event name.
pub const RECEIVED_SUFFIX: &str = "-received";

/// Inbound message kinds. Unknown kinds are kept, lower-cased, in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    ResponseTokens,
    Other(String),
}

impl MessageType {
    /// Classify a raw `message_type` value. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        match lower.as_str() {
            "response-tokens" => MessageType::ResponseTokens,
            _ => MessageType::Other(lower),
        }
    }

    /// Lower-case wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::ResponseTokens => "response-tokens",
            MessageType::Other(s) => s,
        }
    }

    /// Name of the local event dispatched for this kind, e.g.
    /// `response-tokens-received`.
    pub fn event_name(&self) -> String {
        format!("{}{}", self.as_str(), RECEIVED_SUFFIX)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail of a `<type>-received` event: the full envelope and the time it
/// arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundEvent {
    #[serde(skip)]
    pub kind: MessageType,
    pub message: serde_json::Value,
    pub timestamp: u64,
}

impl InboundEvent {
    /// Typed view of a `response-tokens` envelope.
    pub fn chunk(&self) -> Result<ResponseChunk, ProtocolError> {
        ResponseChunk::deserialize(&self.message).map_err(ProtocolError::InvalidChunk)
    }
}

/// Everything that can be dispatched inside the client.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalEvent {
    UserTalked(OutgoingMessage),
    Received(InboundEvent),
}

impl LocalEvent {
    pub fn event_name(&self) -> String {
        match self {
            LocalEvent::UserTalked(_) => USER_TALKED.to_string(),
            LocalEvent::Received(inbound) => inbound.kind.event_name(),
        }
    }
}
