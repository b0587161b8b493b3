use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StyleBotError};

/// Embedding model identifiers the knowledge crate knows how to build.
pub const KNOWN_EMBEDDING_MODELS: &[&str] = &["lexical-hash"];

/// Top-level configuration for StyleBot.
///
/// Loaded from `stylebot.toml` by default. Each section corresponds to one
/// component of the assistant; every section falls back to its defaults
/// when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleBotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub server: ServerConfig,
}

impl StyleBotConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StyleBotConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file is missing, unparsable, or fails validation.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check every cross-field constraint once, at startup.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if !KNOWN_EMBEDDING_MODELS.contains(&r.embedding_model.as_str()) {
            return Err(invalid(format!(
                "unknown embedding model '{}' (expected one of: {})",
                r.embedding_model,
                KNOWN_EMBEDDING_MODELS.join(", ")
            )));
        }
        if r.embedding_dimensions == 0 {
            return Err(invalid("retrieval.embedding_dimensions must be positive"));
        }
        if r.top_k == 0 {
            return Err(invalid("retrieval.top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&r.similarity_threshold) {
            return Err(invalid("retrieval.similarity_threshold must be within [0, 1]"));
        }
        if r.chunk_size == 0 {
            return Err(invalid("retrieval.chunk_size must be positive"));
        }
        if r.chunk_overlap >= r.chunk_size {
            return Err(invalid("retrieval.chunk_overlap must be smaller than chunk_size"));
        }

        if self.design.max_suggestions == 0 {
            return Err(invalid("design.max_suggestions must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.design.creativity) {
            return Err(invalid("design.creativity must be within [0, 1]"));
        }

        let g = &self.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(invalid("generation.temperature must be within [0, 2]"));
        }
        if g.max_tokens == 0 {
            return Err(invalid("generation.max_tokens must be positive"));
        }
        if g.timeout_secs == 0 {
            return Err(invalid("generation.timeout_secs must be positive"));
        }

        if self.memory.max_turns == 0 {
            return Err(invalid("memory.max_turns must be at least 1"));
        }
        if self.memory.context_turns > self.memory.max_turns {
            return Err(invalid("memory.context_turns cannot exceed memory.max_turns"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> StyleBotError {
    StyleBotError::Config(msg.into())
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` wins when set.
    pub log_level: String,
    /// Directory holding the knowledge-base markdown files and `products.json`.
    pub knowledge_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            knowledge_dir: "knowledge_base".to_string(),
        }
    }
}

/// Chunking, embedding and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding model identifier. Only `lexical-hash` ships in-tree.
    pub embedding_model: String,
    /// Output dimensionality of the embedding model.
    pub embedding_dimensions: usize,
    /// Maximum number of chunks returned per query.
    pub top_k: usize,
    /// Minimum cosine similarity for a chunk to be returned.
    pub similarity_threshold: f64,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: "lexical-hash".to_string(),
            embedding_dimensions: 1024,
            top_k: 3,
            similarity_threshold: 0.2,
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Design suggestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Upper bound on suggestions per batch.
    pub max_suggestions: usize,
    /// 0.0 collapses to the single best match, 1.0 samples the widest variety.
    pub creativity: f64,
    /// Seed for the design RNG. A random seed is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            creativity: 0.8,
            seed: None,
        }
    }
}

/// Which text generation backend composes responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Deterministic in-process generation.
    #[default]
    Local,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(rename = "openai")]
    OpenAi,
    /// No provider; every response uses the template composer.
    None,
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: ProviderKind,
    /// Remote model name.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Upper bound on a single provider call before falling back to templates.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 20,
        }
    }
}

/// Conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Turns retained per session before FIFO eviction.
    pub max_turns: usize,
    /// Prior turns included in the generation context window.
    pub context_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            context_turns: 5,
        }
    }
}

/// Feature switches. A disabled feature yields an explicitly empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub rag_enabled: bool,
    pub design_enabled: bool,
    pub memory_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            rag_enabled: true,
            design_enabled: true,
            memory_enabled: true,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3040 }
    }
}
