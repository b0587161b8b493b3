//! Text generation providers.
//!
//! A provider turns a filled prompt template into reply text. The remote
//! provider speaks the OpenAI-compatible chat completions API; the local one
//! is deterministic and extractive, so the agent runs without network
//! access. Either may fail: the agent always has a template to fall back on.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use stylebot_core::config::{GenerationConfig, ProviderKind};
use stylebot_core::types::ContextChunk;

use crate::prompts::SYSTEM_PROMPT;

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Errors and parameters
// =============================================================================

/// Errors produced by generation providers.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body could not be understood.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// An extractive provider had nothing to extract from.
    #[error("no context to generate from")]
    NoContext,
}

impl GenerationError {
    /// Failures that are expected in normal operation and need no diagnostic.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::NoContext)
    }
}

/// Sampling parameters passed with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A text-completion capability.
///
/// `context` holds the same retrieved chunks already rendered into
/// `prompt`, for providers that work from the chunks directly.
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        context: &[ContextChunk],
        params: GenerationParams,
    ) -> Result<String, GenerationError>;
}

/// Build the configured provider. `Ok(None)` means templates only.
pub fn provider_from_config(
    config: &GenerationConfig,
) -> Result<Option<Arc<dyn GenerationProvider>>, GenerationError> {
    let provider: Option<Arc<dyn GenerationProvider>> = match config.provider {
        ProviderKind::Local => Some(Arc::new(LocalProvider::new())),
        ProviderKind::OpenAi => Some(Arc::new(OpenAiProvider::from_config(config)?)),
        ProviderKind::None => None,
    };
    info!(
        provider = provider.as_ref().map(|p| p.name()).unwrap_or("none"),
        "Generation provider ready"
    );
    Ok(provider)
}

// =============================================================================
// Local provider
// =============================================================================

const LOCAL_MAX_SENTENCES: usize = 3;

/// Deterministic extractive provider.
///
/// Answers with the leading sentences of the best-ranked chunks, bounded by
/// `max_tokens` words. Fails with [`GenerationError::NoContext`] when there
/// is nothing to extract from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }

    fn extract(context: &[ContextChunk], max_words: usize) -> String {
        let mut picked: Vec<&str> = Vec::new();
        let mut words = 0;

        'chunks: for chunk in context {
            for sentence in split_sentences(&chunk.text) {
                let n = sentence.split_whitespace().count();
                if n == 0 || picked.contains(&sentence) {
                    continue;
                }
                if !picked.is_empty() && words + n > max_words {
                    break 'chunks;
                }
                picked.push(sentence);
                words += n;
                if picked.len() >= LOCAL_MAX_SENTENCES {
                    break 'chunks;
                }
            }
        }
        picked.join(" ")
    }
}

#[async_trait::async_trait]
impl GenerationProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(
        &self,
        _prompt: &str,
        context: &[ContextChunk],
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        if context.is_empty() {
            return Err(GenerationError::NoContext);
        }
        let text = Self::extract(context, params.max_tokens.max(1) as usize);
        if text.is_empty() {
            return Err(GenerationError::NoContext);
        }
        Ok(format!("Here's what I found: {}", text))
    }
}

/// Split on sentence-ending punctuation followed by whitespace, and on
/// line breaks. Markdown heading markers and list bullets are stripped.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim().trim_start_matches(['#', '-', '*', ' ']);
        let mut start = 0;
        let bytes = line.as_bytes();
        for (i, ch) in line.char_indices() {
            if matches!(ch, '.' | '!' | '?')
                && bytes.get(i + 1).is_some_and(|b| b.is_ascii_whitespace())
            {
                out.push(line[start..=i].trim());
                start = i + 1;
            }
        }
        let rest = line[start..].trim();
        if !rest.is_empty() {
            out.push(rest);
        }
    }
    out.retain(|s| !s.is_empty());
    out
}

// =============================================================================
// OpenAI-compatible provider
// =============================================================================

/// Remote provider over `/chat/completions`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Read the API key from the configured env var and build the client.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(api_key, config)
    }

    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerationError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, GenerationError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(GenerationError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        _context: &[ContextChunk],
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        let messages = [
            CcMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            CcMessage {
                role: "user",
                content: prompt,
            },
        ];
        let body = CcRequest {
            model: &self.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            messages: &messages,
        };
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending completion request");
        let text = self.send_json("/chat/completions", &body).await?;
        parse_completion(&text)
    }
}

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: &'a [CcMessage<'a>],
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Pull `choices[0].message.content` out of a chat completions response.
pub(crate) fn parse_completion(json_text: &str) -> Result<String, GenerationError> {
    let root: Value =
        serde_json::from_str(json_text).map_err(|e| GenerationError::ApiParse(e.to_string()))?;
    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(GenerationError::ApiParse("missing choices[0]".to_string()));
    };
    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(GenerationError::ApiParse("empty completion".to_string()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: usize, text: &str) -> ContextChunk {
        ContextChunk {
            chunk_id: id,
            source_label: "faq.md".into(),
            text: text.into(),
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn test_local_provider_extracts_leading_sentences() {
        let provider = LocalProvider::new();
        let context = vec![chunk(
            0,
            "## Returns\nWe offer a 30-day return policy. Custom items are non-returnable. \
             Refunds take 5 days. Exchanges are free.",
        )];
        let text = provider
            .generate("ignored", &context, GenerationParams::default())
            .await
            .unwrap();
        assert!(text.starts_with("Here's what I found:"));
        assert!(text.contains("Returns"));
        assert!(text.contains("30-day"));
        assert!(!text.contains("Exchanges"));
    }

    #[tokio::test]
    async fn test_local_provider_is_deterministic() {
        let provider = LocalProvider::new();
        let context = vec![chunk(0, "Standard shipping takes 5-7 days."), chunk(1, "Express takes 2.")];
        let params = GenerationParams::default();
        let a = provider.generate("p", &context, params).await.unwrap();
        let b = provider.generate("p", &context, params).await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("Express takes 2."));
    }

    #[tokio::test]
    async fn test_local_provider_word_budget() {
        let provider = LocalProvider::new();
        let context = vec![chunk(0, "One two three four. Five six seven eight.")];
        let params = GenerationParams {
            temperature: 0.0,
            max_tokens: 5,
        };
        let text = provider.generate("p", &context, params).await.unwrap();
        assert_eq!(text, "Here's what I found: One two three four.");
    }

    #[tokio::test]
    async fn test_local_provider_without_context() {
        let err = LocalProvider::new()
            .generate("p", &[], GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoContext));
        assert!(err.is_quiet());
    }

    #[test]
    fn test_split_sentences() {
        let parts = split_sentences("# Title\nFirst one. Second one!\n- bullet item\nv1.2 stays");
        assert_eq!(
            parts,
            vec!["Title", "First one.", "Second one!", "bullet item", "v1.2 stays"]
        );
    }

    #[test]
    fn test_openai_missing_api_key() {
        let config = GenerationConfig {
            provider: ProviderKind::OpenAi,
            api_key_env: "STYLEBOT_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..GenerationConfig::default()
        };
        let err = OpenAiProvider::from_config(&config).unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey { ref var } if var == "STYLEBOT_TEST_KEY_THAT_IS_NEVER_SET"));
        assert!(provider_from_config(&config).is_err());
    }

    #[test]
    fn test_openai_new_trims_base_url() {
        let config = GenerationConfig {
            base_url: "http://localhost:9999/v1/".into(),
            ..GenerationConfig::default()
        };
        let provider = OpenAiProvider::new("sk-test".into(), &config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:9999/v1");
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [CcMessage {
            role: "user",
            content: "hi",
        }];
        let body = CcRequest {
            model: "gpt-4o-mini",
            max_tokens: 50,
            temperature: 0.7,
            messages: &messages,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "  Hello!  " },
                "finish_reason": "stop"
            }]
        })
        .to_string();
        assert_eq!(parse_completion(&json).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_completion_errors() {
        let empty = serde_json::json!({ "choices": [] }).to_string();
        assert!(matches!(parse_completion(&empty), Err(GenerationError::ApiParse(_))));

        let null_content = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })
        .to_string();
        assert!(parse_completion(&null_content).is_err());

        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn test_provider_from_config_kinds() {
        let local = provider_from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(local.unwrap().name(), "local");

        let none = provider_from_config(&GenerationConfig {
            provider: ProviderKind::None,
            ..GenerationConfig::default()
        })
        .unwrap();
        assert!(none.is_none());
    }
}
