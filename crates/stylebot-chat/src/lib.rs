//! Conversational core for StyleBot.
//!
//! Classifies each message, routes it to knowledge retrieval or the design
//! engine, composes a reply through a generation provider (falling back to
//! deterministic templates) and keeps bounded per-session memory.

pub mod classifier;
pub mod design;
pub mod error;
pub mod generation;
pub mod memory;
pub mod orchestrator;
pub mod prompts;
pub mod response;

pub use classifier::{ClassifiedIntent, IntentClassifier};
pub use design::DesignSuggestionEngine;
pub use error::ChatError;
pub use generation::{
    provider_from_config, GenerationError, GenerationParams, GenerationProvider, LocalProvider,
    OpenAiProvider,
};
pub use memory::ConversationMemory;
pub use orchestrator::{Agent, AgentBuilder};
pub use response::ResponseComposer;
