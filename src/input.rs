//! User input capture.
//!
//! The [`Composer`] holds the text the user is typing. `submit` turns it
//! into a `user-talked` event or, for blank input, does nothing at all.

use tracing::debug;

use crate::events::LocalEvent;
use crate::protocol::OutgoingMessage;

#[derive(Debug, Default)]
pub struct Composer {
    text: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of the input field.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the input field contents.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Package the current input as a `user-talked` event and clear the field.
    ///
    /// Blank (empty or whitespace-only) input yields `None` and is left in
    /// place untouched.
    pub fn submit(&mut self) -> Option<LocalEvent> {
        if self.text.trim().is_empty() {
            debug!("Nothing to send.");
            return None;
        }
        let message = OutgoingMessage::new(std::mem::take(&mut self.text));
        debug!(query_id = %message.query_id, "user talked");
        Some(LocalEvent::UserTalked(message))
    }
}
