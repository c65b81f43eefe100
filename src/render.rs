//! Rendering layer: turns [`ViewUpdate`]s into output.
//!
//! Message content is always treated as text. The terminal renderer drops
//! control characters and escape sequences, and the HTML renderer escapes
//! markup, so nothing a user or the server sends can restyle the output.

use colored::*;
use std::io::{self, Write};

use crate::config::ClientConfig;
use crate::view::{Conversation, Role, ViewUpdate};

pub trait Renderer {
    fn apply(&mut self, update: &ViewUpdate, conversation: &Conversation) -> io::Result<()>;

    /// Flush anything still pending when the session ends.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sanitizers
// ---------------------------------------------------------------------------

/// Strip terminal control: ANSI CSI/OSC sequences and other C0/C1 control
/// characters. Newlines and tabs survive.
pub fn sanitize_terminal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                // CSI: ESC [ params... final byte in 0x40..=0x7E
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: ESC ] ... terminated by BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Escape text for insertion into HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Streams the conversation as a transcript, printing fragments as they
/// arrive.
///
/// A user line submitted while a reply is mid-line is held back until that
/// line closes, so one reply never straddles the echo.
pub struct TerminalRenderer<W: Write> {
    out: W,
    user_label: String,
    bot_label: String,
    color: bool,
    /// Bot response whose line is currently open.
    open_line: Option<String>,
    held: Vec<String>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, config: &ClientConfig) -> Self {
        Self {
            out,
            user_label: config.user_label.clone(),
            bot_label: config.bot_label.clone(),
            color: config.color,
            open_line: None,
            held: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn label(&self, role: Role) -> String {
        let (text, fallback) = match role {
            Role::User => (&self.user_label, "you"),
            Role::Bot => (&self.bot_label, "bot"),
        };
        let text = if text.is_empty() { fallback } else { text.as_str() };
        let text = format!("{}>", sanitize_terminal(text));
        if !self.color {
            return text;
        }
        match role {
            Role::User => text.cyan().bold().to_string(),
            Role::Bot => text.green().bold().to_string(),
        }
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.open_line.take().is_some() {
            writeln!(self.out)?;
        }
        for line in self.held.drain(..) {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn open_bot_line(&mut self, query_id: &str) -> io::Result<()> {
        if self.open_line.as_deref() == Some(query_id) {
            return Ok(());
        }
        self.close_line()?;
        let label = self.label(Role::Bot);
        write!(self.out, "{} ", label)?;
        self.open_line = Some(query_id.to_string());
        Ok(())
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn apply(&mut self, update: &ViewUpdate, conversation: &Conversation) -> io::Result<()> {
        match update {
            ViewUpdate::Created { .. } => {}
            ViewUpdate::TextSet { role, text, .. } => {
                let line = format!("{} {}", self.label(*role), sanitize_terminal(text));
                if self.open_line.is_some() {
                    self.held.push(line);
                } else {
                    writeln!(self.out, "{}", line)?;
                }
            }
            ViewUpdate::Appended { query_id, fragment } => {
                self.open_bot_line(query_id)?;
                write!(self.out, "{}", sanitize_terminal(fragment))?;
            }
            ViewUpdate::Completed { query_id } => {
                if self.open_line.as_deref() == Some(query_id.as_str()) {
                    self.close_line()?;
                } else if conversation
                    .get(Role::Bot, query_id)
                    .is_some_and(|e| e.text.is_empty())
                {
                    // Nothing was streamed; still show that a reply arrived.
                    self.open_bot_line(query_id)?;
                    self.close_line()?;
                }
            }
        }
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.close_line()?;
        self.out.flush()
    }
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Render the whole conversation as a sequence of `div.chat` blocks.
pub fn render_document(conversation: &Conversation) -> String {
    let mut html = String::new();
    for entry in conversation.entries() {
        let complete = if entry.complete { " complete" } else { "" };
        html.push_str(&format!(
            "<div class=\"chat {}{}\" id=\"{}\">{}</div>\n",
            entry.role.css_class(),
            complete,
            escape_html(&entry.key()),
            escape_html(&entry.text),
        ));
    }
    html
}

/// Keeps an HTML snapshot of the conversation current with every update.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    document: String,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

impl Renderer for HtmlRenderer {
    fn apply(&mut self, _update: &ViewUpdate, conversation: &Conversation) -> io::Result<()> {
        self.document = render_document(conversation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OutgoingMessage, ResponseChunk};

    fn plain_config() -> ClientConfig {
        ClientConfig {
            color: false,
            ..ClientConfig::default()
        }
    }

    fn chunk(id: &str, tokens: Option<&str>, done: bool) -> ResponseChunk {
        ResponseChunk {
            query_id: id.to_string(),
            is_complete: done,
            tokens: tokens.map(str::to_string),
        }
    }

    fn drive<R: Renderer>(renderer: &mut R, conv: &Conversation, updates: Vec<ViewUpdate>) {
        for u in &updates {
            renderer.apply(u, conv).unwrap();
        }
    }

    #[test]
    fn test_sanitize_keeps_plain_text() {
        assert_eq!(sanitize_terminal("hello\tworld\n"), "hello\tworld\n");
    }

    #[test]
    fn test_sanitize_strips_csi_and_osc() {
        assert_eq!(sanitize_terminal("a\u{1b}[31mred\u{1b}[0m"), "ared");
        assert_eq!(sanitize_terminal("x\u{1b}]0;pwned\u{07}y"), "xy");
        assert_eq!(sanitize_terminal("x\u{1b}]0;pwned\u{1b}\\y"), "xy");
    }

    #[test]
    fn test_sanitize_strips_bare_controls() {
        assert_eq!(sanitize_terminal("a\rb\u{08}c\u{7f}"), "abc");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_terminal_transcript_streams_fragments() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        let msg = OutgoingMessage {
            query_id: "q".to_string(),
            message: "hello".to_string(),
            timestamp: 0,
        };
        let u = conv.render_own_message(&msg);
        drive(&mut r, &conv, u);
        for c in [chunk("q", Some("Hi"), false), chunk("q", Some(" there"), false), chunk("q", None, true)] {
            let u = conv.apply_chunk(&c);
            drive(&mut r, &conv, u);
        }
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "you> hello\nbot> Hi there\n");
    }

    #[test]
    fn test_terminal_interleaved_responses_get_own_lines() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        for c in [chunk("a", Some("1"), false), chunk("b", Some("x"), false), chunk("a", Some("2"), true)] {
            let u = conv.apply_chunk(&c);
            drive(&mut r, &conv, u);
        }
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "bot> 1\nbot> x\nbot> 2\n");
    }

    #[test]
    fn test_terminal_user_line_waits_for_open_reply() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        let u = conv.apply_chunk(&chunk("q", Some("Hel"), false));
        drive(&mut r, &conv, u);
        let next = OutgoingMessage {
            query_id: "q2".to_string(),
            message: "next".to_string(),
            timestamp: 0,
        };
        let u = conv.render_own_message(&next);
        drive(&mut r, &conv, u);
        for c in [chunk("q", Some("lo"), false), chunk("q", None, true)] {
            let u = conv.apply_chunk(&c);
            drive(&mut r, &conv, u);
        }
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "bot> Hello\nyou> next\n");
    }

    #[test]
    fn test_terminal_finish_releases_held_lines() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        let u = conv.apply_chunk(&chunk("q", Some("cut"), false));
        drive(&mut r, &conv, u);
        let msg = OutgoingMessage {
            query_id: "q2".to_string(),
            message: "still there?".to_string(),
            timestamp: 0,
        };
        let u = conv.render_own_message(&msg);
        drive(&mut r, &conv, u);
        r.finish().unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "bot> cut\nyou> still there?\n");
    }

    #[test]
    fn test_terminal_empty_completed_reply_shows_label() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        let u = conv.apply_chunk(&chunk("q", None, true));
        drive(&mut r, &conv, u);
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "bot> \n");
    }

    #[test]
    fn test_terminal_neutralizes_escape_injection() {
        let mut conv = Conversation::new();
        let mut r = TerminalRenderer::new(Vec::new(), &plain_config());
        let u = conv.apply_chunk(&chunk("q", Some("\u{1b}[2Jgotcha"), false));
        drive(&mut r, &conv, u);
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert!(!out.contains('\u{1b}'));
        assert!(out.contains("gotcha"));
    }

    #[test]
    fn test_html_document_marks_complete_and_escapes() {
        let mut conv = Conversation::new();
        let mut r = HtmlRenderer::new();
        let msg = OutgoingMessage {
            query_id: "q".to_string(),
            message: "<b>hi</b>".to_string(),
            timestamp: 0,
        };
        let u = conv.render_own_message(&msg);
        drive(&mut r, &conv, u);
        let u = conv.apply_chunk(&chunk("q", Some("<script>x</script>"), true));
        drive(&mut r, &conv, u);
        assert_eq!(
            r.document(),
            "<div class=\"chat user\" id=\"user-message-q\">&lt;b&gt;hi&lt;/b&gt;</div>\n\
             <div class=\"chat bot complete\" id=\"response-q\">&lt;script&gt;x&lt;/script&gt;</div>\n"
        );
    }

    #[test]
    fn test_html_streaming_entry_not_complete() {
        let mut conv = Conversation::new();
        conv.apply_chunk(&chunk("q", Some("part"), false));
        let html = render_document(&conv);
        assert!(html.contains("class=\"chat bot\""));
        assert!(!html.contains("complete"));
    }
}
