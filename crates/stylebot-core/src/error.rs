use thiserror::Error;

/// Top-level error type for StyleBot.
///
/// Subsystem crates define their own error types where they need richer
/// variants and convert into `StyleBotError` at crate boundaries so the `?`
/// operator works across them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StyleBotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge error: {0}")]
    Knowledge(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for StyleBotError {
    fn from(err: toml::de::Error) -> Self {
        StyleBotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StyleBotError {
    fn from(err: toml::ser::Error) -> Self {
        StyleBotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StyleBotError {
    fn from(err: serde_json::Error) -> Self {
        StyleBotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for StyleBot operations.
pub type Result<T> = std::result::Result<T, StyleBotError>;
