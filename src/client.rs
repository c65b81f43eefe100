//! The chat client: one explicitly constructed object that owns the input
//! composer, the conversation, the renderer and the outgoing queue, plus
//! the event loop that drives it.
//!
//! ## Event flow
//! 1. A stdin line lands in the [`Composer`]; `submit` emits `user-talked`.
//! 2. `dispatch(user-talked)` renders the user's message and queues it for
//!    the socket.
//! 3. Inbound frames become `<type>-received` events; `response-tokens`
//!    chunks are applied to the conversation and rendered.
//!
//! Everything runs on one task; nothing here is shared or locked.

use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;
use crate::events::{InboundEvent, LocalEvent, MessageType};
use crate::input::Composer;
use crate::protocol::{now_ms, OutgoingMessage, QueryId};
use crate::render::Renderer;
use crate::transport::{self, ClientStream, Inbound};
use crate::view::{Conversation, ResponseState, Role, ViewUpdate};

pub struct ChatClient<R: Renderer> {
    composer: Composer,
    conversation: Conversation,
    renderer: R,
    outgoing: VecDeque<OutgoingMessage>,
}

impl<R: Renderer> ChatClient<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            composer: Composer::new(),
            conversation: Conversation::new(),
            renderer,
            outgoing: VecDeque::new(),
        }
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Submit whatever is in the composer. Returns the new query id, or
    /// `None` when the input was blank.
    pub fn submit(&mut self) -> Result<Option<QueryId>, ChatError> {
        let Some(event) = self.composer.submit() else {
            return Ok(None);
        };
        let query_id = match &event {
            LocalEvent::UserTalked(msg) => Some(msg.query_id.clone()),
            LocalEvent::Received(_) => None,
        };
        self.dispatch(event)?;
        Ok(query_id)
    }

    /// Route one local event to its handler.
    pub fn dispatch(&mut self, event: LocalEvent) -> Result<(), ChatError> {
        match event {
            LocalEvent::UserTalked(msg) => {
                let updates = self.conversation.render_own_message(&msg);
                self.render(&updates)?;
                self.outgoing.push_back(msg);
            }
            LocalEvent::Received(inbound) => match inbound.kind {
                MessageType::ResponseTokens => self.on_response_tokens(&inbound)?,
                MessageType::Other(_) => {
                    debug!(event = %inbound.kind.event_name(), "no handler registered");
                }
            },
        }
        Ok(())
    }

    fn on_response_tokens(&mut self, inbound: &InboundEvent) -> Result<(), ChatError> {
        let chunk = match inbound.chunk() {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(error = %e, "dropping response-tokens message");
                return Ok(());
            }
        };
        let updates = self.conversation.apply_chunk(&chunk);
        self.render(&updates)
    }

    fn render(&mut self, updates: &[ViewUpdate]) -> Result<(), ChatError> {
        for update in updates {
            self.renderer.apply(update, &self.conversation)?;
        }
        Ok(())
    }

    /// End of session: let the renderer flush anything it held back.
    pub fn finish(&mut self) -> Result<(), ChatError> {
        self.renderer.finish()?;
        Ok(())
    }

    /// Messages waiting to be written to the socket, oldest first.
    pub fn drain_outgoing(&mut self) -> Vec<OutgoingMessage> {
        self.outgoing.drain(..).collect()
    }

    /// True while any submitted query has no completed response yet.
    pub fn has_pending(&self) -> bool {
        self.conversation
            .entries()
            .iter()
            .filter(|e| e.role == Role::User)
            .any(|e| self.conversation.response_state(&e.query_id) != Some(ResponseState::Complete))
    }
}

/// Decode one raw stdin line, dropping the line terminator. Bytes that are
/// not UTF-8 become U+FFFD instead of ending the session.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(error = %e, "input line is not valid UTF-8");
            String::from_utf8_lossy(raw).into_owned()
        }
    }
}

/// Drive a session until input ends and every response has completed, or
/// until the socket closes.
///
/// End of input does not cut off replies still streaming; the loop keeps
/// reading the socket until they finish, then closes it.
pub async fn run<R, I>(
    client: &mut ChatClient<R>,
    ws: ClientStream,
    input: I,
) -> Result<(), ChatError>
where
    R: Renderer,
    I: AsyncBufRead + Unpin,
{
    let (mut sink, mut stream) = ws.split();
    let mut lines = SplitStream::new(input.split(b'\n'));
    let mut input_done = false;

    loop {
        if input_done && !client.has_pending() {
            info!("input closed, no replies pending");
            if let Err(e) = sink.close().await {
                debug!(error = %e, "close handshake failed");
            }
            return Ok(());
        }

        tokio::select! {
            line = lines.next(), if !input_done => match line {
                Some(Ok(raw)) => {
                    client.composer_mut().set_text(decode_line(&raw));
                    client.submit()?;
                }
                Some(Err(e)) => return Err(e.into()),
                None => input_done = true,
            },
            frame = stream.next() => match frame {
                Some(Ok(frame)) => match transport::classify(frame, now_ms()) {
                    Inbound::Event(event) => client.dispatch(event)?,
                    Inbound::Ignored => {}
                    Inbound::Closed => return Err(ChatError::ConnectionClosed),
                },
                Some(Err(e)) => {
                    warn!(error = %e, "socket error");
                    return Err(ChatError::ConnectionClosed);
                }
                None => return Err(ChatError::ConnectionClosed),
            },
        }

        for msg in client.drain_outgoing() {
            transport::send(&mut sink, &msg).await?;
        }
    }
}
