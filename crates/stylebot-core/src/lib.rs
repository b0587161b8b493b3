//! Shared building blocks for StyleBot: configuration, the error type,
//! domain types and diagnostic events.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::StyleBotConfig;
pub use error::{Result, StyleBotError};
pub use events::{Diagnostic, TurnPhase};
pub use types::*;
