//! Chat screen — header, message bubbles, typing line and input.

use crate::chat::{ChatEngine, ChatEvent, Message, Role};
use crate::config::APP_TITLE;
use crate::error::ChatError;

pub const INPUT_PLACEHOLDER: &str = "Ask about Islam, guidance, or anything else...";
pub const LOADING_INDICATOR: &str = "…";

const DEFAULT_VIEWPORT_ROWS: usize = 20;
const TYPING_CURSOR: char = '▌';

/// Scroll state of the message list. `offset` counts rows up from the bottom.
#[derive(Debug, Clone)]
pub struct ChatView {
    viewport_rows: usize,
    offset: usize,
}

impl ChatView {
    pub fn new(viewport_rows: usize) -> Self {
        Self {
            viewport_rows: viewport_rows.max(1),
            offset: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset == 0
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = 0;
    }

    /// Every append or transcript swap snaps the view back to the bottom.
    pub fn on_event(&mut self, event: &ChatEvent) {
        if matches!(
            event,
            ChatEvent::MessageAppended { .. } | ChatEvent::TranscriptReset { .. }
        ) {
            self.scroll_to_bottom();
        }
    }

    pub fn render(&self, engine: &ChatEngine) -> String {
        let mut out = vec![APP_TITLE.to_string(), "═".repeat(APP_TITLE.chars().count())];

        let rows: Vec<String> = engine.transcript().iter().flat_map(bubble).collect();
        let end = rows.len().saturating_sub(self.offset);
        let start = end.saturating_sub(self.viewport_rows);
        if start > 0 {
            out.push(format!("  ↑ {start} more"));
        }
        out.extend_from_slice(&rows[start..end]);

        if engine.is_typing() {
            out.push(typing_line(engine.partial()));
        } else if engine.is_busy() {
            out.push(LOADING_INDICATOR.to_string());
        }
        if let Some(error) = engine.last_error() {
            out.push(banner(error));
        }

        out.push(String::new());
        out.push(input_line(engine.input()));
        out.join("\n")
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_ROWS)
    }
}

fn label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    }
}

/// One message as display rows; continuation lines are indented under the label.
pub fn bubble(message: &Message) -> Vec<String> {
    let label = label(message.role);
    let indent = " ".repeat(label.len() + 2);
    let mut lines = message.content.lines();
    let first = lines.next().unwrap_or_default();
    let mut rows = vec![format!("{label}: {first}")];
    rows.extend(lines.map(|l| format!("{indent}{l}")));
    rows
}

pub fn typing_line(partial: &str) -> String {
    format!("{}: {partial}{TYPING_CURSOR}", label(Role::Assistant))
}

pub fn banner(error: &ChatError) -> String {
    if error.is_retryable() {
        format!("! {error} (type /retry to try again)")
    } else {
        format!("! {error}")
    }
}

pub fn input_line(input: &str) -> String {
    if input.is_empty() {
        format!("> {INPUT_PLACEHOLDER}")
    } else {
        format!("> {input}")
    }
}
