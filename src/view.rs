//! Conversation view-model.
//!
//! Holds one [`Entry`] per `(role, query id)` and mutates it only through
//! text set/append and a one-way completion flag. Each mutation reports what
//! changed as [`ViewUpdate`]s so a renderer can draw it without looking at
//! the protocol.

use std::collections::HashMap;
use tracing::debug;

use crate::protocol::{OutgoingMessage, QueryId, ResponseChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Prefix of the entry key, e.g. `user-message-<id>`.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Role::User => "user-message-",
            Role::Bot => "response-",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

/// Lifecycle of a bot response. An id with no entry yet is "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    Streaming,
    Complete,
}

/// One rendered message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub query_id: QueryId,
    pub text: String,
    pub complete: bool,
}

impl Entry {
    fn new(role: Role, query_id: QueryId) -> Self {
        Self {
            role,
            query_id,
            text: String::new(),
            complete: false,
        }
    }

    /// Stable key, unique per `(role, query id)`.
    pub fn key(&self) -> String {
        format!("{}{}", self.role.key_prefix(), self.query_id)
    }
}

/// A single change to the view-model, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Created { role: Role, query_id: QueryId },
    TextSet { role: Role, query_id: QueryId, text: String },
    Appended { query_id: QueryId, fragment: String },
    Completed { query_id: QueryId },
}

#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<Entry>,
    index: HashMap<(Role, QueryId), usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in creation order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, role: Role, query_id: &str) -> Option<&Entry> {
        self.index
            .get(&(role, query_id.to_string()))
            .map(|&i| &self.entries[i])
    }

    /// State of the response for `query_id`; `None` while absent.
    pub fn response_state(&self, query_id: &str) -> Option<ResponseState> {
        self.get(Role::Bot, query_id).map(|e| {
            if e.complete {
                ResponseState::Complete
            } else {
                ResponseState::Streaming
            }
        })
    }

    /// Find the entry for `(role, query_id)`, creating it if absent.
    ///
    /// Returns the entry index and, when it was just created, the matching
    /// `Created` update.
    pub fn find_or_create(&mut self, role: Role, query_id: &str) -> (usize, Option<ViewUpdate>) {
        let key = (role, query_id.to_string());
        if let Some(&i) = self.index.get(&key) {
            return (i, None);
        }
        let i = self.entries.len();
        self.entries.push(Entry::new(role, query_id.to_string()));
        self.index.insert(key, i);
        (
            i,
            Some(ViewUpdate::Created {
                role,
                query_id: query_id.to_string(),
            }),
        )
    }

    /// Show the user's own submission. Content is replaced, not appended.
    pub fn render_own_message(&mut self, msg: &OutgoingMessage) -> Vec<ViewUpdate> {
        let (i, created) = self.find_or_create(Role::User, &msg.query_id);
        self.entries[i].text = msg.message.clone();
        created
            .into_iter()
            .chain(std::iter::once(ViewUpdate::TextSet {
                role: Role::User,
                query_id: msg.query_id.clone(),
                text: msg.message.clone(),
            }))
            .collect()
    }

    /// Apply one streamed chunk to the response for its query id.
    ///
    /// Fragments are appended in arrival order, with no reordering or
    /// deduplication. Completion is one-way: once set it is never cleared,
    /// and `Completed` is reported only on the transition.
    pub fn apply_chunk(&mut self, chunk: &ResponseChunk) -> Vec<ViewUpdate> {
        let (i, created) = self.find_or_create(Role::Bot, &chunk.query_id);
        let mut updates: Vec<ViewUpdate> = created.into_iter().collect();
        let entry = &mut self.entries[i];

        if let Some(fragment) = chunk.fragment() {
            if entry.complete {
                debug!(query_id = %chunk.query_id, "fragment after completion");
            }
            entry.text.push_str(fragment);
            updates.push(ViewUpdate::Appended {
                query_id: chunk.query_id.clone(),
                fragment: fragment.to_string(),
            });
        }
        if chunk.is_complete && !entry.complete {
            entry.complete = true;
            updates.push(ViewUpdate::Completed {
                query_id: chunk.query_id.clone(),
            });
        }
        updates
    }
}
