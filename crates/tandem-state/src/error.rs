//! Error types for client state.

/// Errors that can occur when appending to the chat log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The text is empty once surrounding whitespace is removed.
    #[error("chat text is empty")]
    EmptyText,
}
