//! Error types for the conversational core.
//!
//! `Agent::handle_message` never fails; these cover the session management
//! calls around it.

use stylebot_core::error::StyleBotError;
use stylebot_core::types::SessionId;

/// Errors from session management and agent construction.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("memory lock poisoned: {0}")]
    StatePoisoned(String),
    #[error("agent setup failed: {0}")]
    Setup(String),
}

impl From<StyleBotError> for ChatError {
    fn from(err: StyleBotError) -> Self {
        ChatError::Setup(err.to_string())
    }
}

impl From<ChatError> for StyleBotError {
    fn from(err: ChatError) -> Self {
        StyleBotError::Session(err.to_string())
    }
}
