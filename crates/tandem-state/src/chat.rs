//! The chat log: an append-only, in-memory sequence of chat entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use tandem_protocol::Username;

use crate::ChatError;

/// One chat line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub author: Username,
    pub text: String,
}

/// Renders as `author: text`.
impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.author, self.text)
    }
}

/// Rejects text that is empty after trimming.
pub fn validate_text(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyText);
    }
    Ok(())
}

/// Chat history in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry and returns it so the caller can render exactly
    /// the new line.
    ///
    /// # Errors
    /// [`ChatError::EmptyText`] for whitespace-only text; nothing is appended.
    pub fn append(
        &mut self,
        author: Username,
        text: impl Into<String>,
    ) -> Result<&ChatEntry, ChatError> {
        let text = text.into();
        validate_text(&text)?;
        self.entries.push(ChatEntry { author, text });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
