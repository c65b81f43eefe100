//! # remo-chat
//!
//! A terminal chat front-end. User input goes out over one persistent
//! WebSocket as `{queryId, message, timestamp}`; streamed `response-tokens`
//! envelopes come back and are rendered as they arrive.
//!
//! ```rust,ignore
//! let config = ClientConfig::default();
//! let ws = transport::connect(&config.endpoint()).await?;
//! let mut client = ChatClient::new(TerminalRenderer::new(std::io::stdout(), &config));
//! client::run(&mut client, ws, tokio::io::BufReader::new(tokio::io::stdin())).await?;
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod protocol;
pub mod render;
pub mod server;
pub mod transport;
pub mod view;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ChatError, ProtocolError};
pub use events::{InboundEvent, LocalEvent, MessageType};
pub use protocol::{OutgoingMessage, QueryId, ResponseChunk};
pub use render::{HtmlRenderer, Renderer, TerminalRenderer};
pub use view::{Conversation, Entry, ResponseState, Role, ViewUpdate};
