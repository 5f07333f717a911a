//! # Dialogue Error Types Module
//!
//! Errors raised while applying a transition. None of them is fatal: the engine
//! turns each one into a re-render of the current screen with a notice.

/// Failures that can occur while handling one user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    /// Input is not accepted at the current screen
    InvalidInput(String),
    /// Lookup yielded nothing (empty search, unknown film)
    NotFound(String),
    /// Back was requested with only the root screen left
    AtRoot,
    /// Search or link shortening provider failed
    ExternalService(String),
    /// Storage write or read failed
    Storage(String),
}

impl std::fmt::Display for DialogueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogueError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            DialogueError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DialogueError::AtRoot => write!(f, "Already at the root screen"),
            DialogueError::ExternalService(msg) => write!(f, "External service error: {msg}"),
            DialogueError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for DialogueError {}

impl From<anyhow::Error> for DialogueError {
    fn from(err: anyhow::Error) -> Self {
        DialogueError::Storage(format!("{err:#}"))
    }
}
