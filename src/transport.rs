//! WebSocket transport: connect, send one submission, classify inbound frames.
//!
//! No retry, reconnect or acknowledgement. A closed socket is reported once
//! and ends the session.

use futures_util::{Sink, SinkExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};

use crate::error::ChatError;
use crate::events::LocalEvent;
use crate::protocol::{decode_frame, OutgoingMessage};

pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the client should do with one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    Event(LocalEvent),
    Ignored,
    Closed,
}

/// Open the event socket.
pub async fn connect(endpoint: &str) -> Result<ClientStream, ChatError> {
    let (ws, _response) = tokio_tungstenite::connect_async(endpoint).await?;
    info!(endpoint, "connected");
    Ok(ws)
}

/// Serialize `msg` and write it as a single text frame.
pub async fn send<S>(sink: &mut S, msg: &OutgoingMessage) -> Result<(), ChatError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let text = msg.to_wire()?;
    if text.is_empty() {
        return Ok(());
    }
    debug!(query_id = %msg.query_id, bytes = text.len(), "sending");
    match sink.send(WsMessage::Text(text)).await {
        Ok(()) => Ok(()),
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Err(ChatError::ConnectionClosed),
        Err(e) => Err(e.into()),
    }
}

/// Turn one inbound frame into a local event.
///
/// Frames that cannot be decoded are logged and dropped; they never end the
/// session.
pub fn classify(frame: WsMessage, received_at: u64) -> Inbound {
    match frame {
        WsMessage::Text(text) => match decode_frame(&text, received_at) {
            Ok(event) => {
                debug!(event = %event.event_name(), "dispatching");
                Inbound::Event(event)
            }
            Err(e) => {
                error!(error = %e, "Cannot process message!");
                Inbound::Ignored
            }
        },
        WsMessage::Close(_) => Inbound::Closed,
        // Binary / ping / pong
        _ => Inbound::Ignored,
    }
}
