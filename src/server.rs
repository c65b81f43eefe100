//! Local echo server for demos and end-to-end tests.
//!
//! Speaks the same protocol as the real chat backend on `/ws/events`: each
//! `{queryId, message, timestamp}` frame is answered with a stream of
//! `response-tokens` envelopes (the message echoed back word by word),
//! followed by a completion chunk with empty tokens.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::config::EVENTS_PATH;
use crate::error::ChatError;
use crate::events::MessageType;
use crate::protocol::{OutgoingMessage, ResponseChunk};

/// Pause between streamed words when run from the CLI.
pub const DEFAULT_TOKEN_DELAY: Duration = Duration::from_millis(40);

/// Split the user's message into the chunks of an echo reply.
///
/// Words keep their trailing whitespace so the fragments concatenate back
/// to the message text. The last chunk carries no text and completes the
/// response.
pub fn echo_reply(msg: &OutgoingMessage) -> Vec<ResponseChunk> {
    let mut chunks: Vec<ResponseChunk> = msg
        .message
        .split_inclusive(char::is_whitespace)
        .map(|word| ResponseChunk {
            query_id: msg.query_id.clone(),
            is_complete: false,
            tokens: Some(word.to_string()),
        })
        .collect();
    chunks.push(ResponseChunk {
        query_id: msg.query_id.clone(),
        is_complete: true,
        tokens: Some(String::new()),
    });
    chunks
}

/// Wrap a chunk in its wire envelope.
pub fn envelope(chunk: &ResponseChunk) -> serde_json::Value {
    serde_json::json!({
        "message_type": MessageType::ResponseTokens.as_str(),
        "queryId": chunk.query_id,
        "tokens": chunk.tokens,
        "isComplete": chunk.is_complete,
    })
}

/// Bind `127.0.0.1:port` and serve until the process exits.
pub async fn serve(port: u16) -> Result<(), ChatError> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("echo server listening on ws://127.0.0.1:{}{}", port, EVENTS_PATH);
    serve_on(listener, DEFAULT_TOKEN_DELAY).await
}

/// Accept connections on an already bound listener.
pub async fn serve_on(listener: TcpListener, token_delay: Duration) -> Result<(), ChatError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "connection accepted");
        tokio::spawn(async move {
            match accept(stream).await {
                Ok(ws) => handle_session(ws, token_delay).await,
                Err(e) => warn!(%addr, error = %e, "WS handshake error"),
            }
        });
    }
}

async fn accept(
    stream: TcpStream,
) -> Result<WebSocketStream<TcpStream>, tokio_tungstenite::tungstenite::Error> {
    let check_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == EVENTS_PATH {
            Ok(resp)
        } else {
            let mut err = ErrorResponse::new(Some("Not Found".to_string()));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
    };
    tokio_tungstenite::accept_hdr_async(stream, check_path).await
}

async fn handle_session(ws: WebSocketStream<TcpStream>, token_delay: Duration) {
    let (mut sink, mut stream) = ws.split();

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "session ended");
                break;
            }
        };
        let msg: OutgoingMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "ignoring malformed user message");
                continue;
            }
        };
        info!(query_id = %msg.query_id, "query received");

        for chunk in echo_reply(&msg) {
            if !token_delay.is_zero() {
                tokio::time::sleep(token_delay).await;
            }
            let frame = WsMessage::Text(envelope(&chunk).to_string());
            if sink.send(frame).await.is_err() {
                return;
            }
        }
    }
}
