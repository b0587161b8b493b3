//! Chat orchestrator: routes each message through classification,
//! retrieval or design generation, and reply composition.
//!
//! Every session is driven by its own worker task fed through an mpsc
//! queue, so turns within a session are serialised while sessions run
//! independently. The worker commits a turn to memory even when the caller
//! stops waiting for the reply.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use regex::Regex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use stylebot_core::config::StyleBotConfig;
use stylebot_core::events::{Diagnostic, TurnPhase};
use stylebot_core::types::{
    ChatReply, ContextChunk, DesignSuggestion, Intent, Product, SessionId, SessionStats, Turn,
};
use stylebot_knowledge::{
    embedder_from_config, KnowledgeIndex, ProductCatalog, SharedKnowledgeIndex,
};

use crate::classifier::IntentClassifier;
use crate::design::{reads_as_feedback, DesignSuggestionEngine};
use crate::error::ChatError;
use crate::generation::{provider_from_config, GenerationParams, GenerationProvider};
use crate::memory::ConversationMemory;
use crate::response::{ResponseComposer, TurnContext, FALLBACK_TEXT};

/// Maximum message length in characters; longer input is truncated.
pub const MAX_MESSAGE_CHARS: usize = 2000;

const WORKER_QUEUE_DEPTH: usize = 32;
const DIAGNOSTIC_CHANNEL_CAPACITY: usize = 256;
const MAX_PRODUCTS_PER_REPLY: usize = 3;

static PRONOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:it|its|they|them|their|that|those|this|these)\b")
        .expect("Invalid pronoun regex")
});

struct Job {
    text: String,
    reply: oneshot::Sender<ChatReply>,
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles an [`Agent`] from explicit dependencies. Anything not supplied
/// is built from the configuration.
pub struct AgentBuilder {
    config: StyleBotConfig,
    classifier: IntentClassifier,
    index: Option<Arc<SharedKnowledgeIndex>>,
    catalog: Option<Arc<ProductCatalog>>,
    engine: Option<DesignSuggestionEngine>,
    provider: Option<Option<Arc<dyn GenerationProvider>>>,
}

impl AgentBuilder {
    pub fn new(config: StyleBotConfig) -> Self {
        Self {
            config,
            classifier: IntentClassifier::new(),
            index: None,
            catalog: None,
            engine: None,
            provider: None,
        }
    }

    pub fn index(mut self, index: Arc<SharedKnowledgeIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn catalog(mut self, catalog: Arc<ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn engine(mut self, engine: DesignSuggestionEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.provider = Some(Some(provider));
        self
    }

    /// Answer every turn from templates.
    pub fn without_provider(mut self) -> Self {
        self.provider = Some(None);
        self
    }

    /// Validate the configuration and build the agent.
    pub fn build(self) -> Result<Agent, ChatError> {
        self.config.validate()?;

        let index = match self.index {
            Some(index) => index,
            None => {
                let embedder = embedder_from_config(&self.config.retrieval)?;
                Arc::new(SharedKnowledgeIndex::new(KnowledgeIndex::empty(embedder)))
            }
        };
        let provider = match self.provider {
            Some(provider) => provider,
            None => provider_from_config(&self.config.generation)
                .map_err(|e| ChatError::Setup(e.to_string()))?,
        };
        let engine = self
            .engine
            .unwrap_or_else(|| DesignSuggestionEngine::new(self.config.design.seed));
        let memory = ConversationMemory::from_config(
            &self.config.memory,
            self.config.features.memory_enabled,
        );
        let (diagnostics, _) = broadcast::channel(DIAGNOSTIC_CHANNEL_CAPACITY);

        info!(
            chunks = index.snapshot().len(),
            provider = provider.as_ref().map(|p| p.name()).unwrap_or("none"),
            rag = self.config.features.rag_enabled,
            design = self.config.features.design_enabled,
            memory = self.config.features.memory_enabled,
            "Agent ready"
        );

        Ok(Agent {
            inner: Arc::new(AgentInner {
                classifier: self.classifier,
                index,
                catalog: self.catalog.unwrap_or_default(),
                engine,
                provider,
                composer: ResponseComposer::new(),
                memory: Mutex::new(memory),
                config: self.config,
                diagnostics,
            }),
            workers: Mutex::new(HashMap::new()),
        })
    }
}

// =============================================================================
// Agent
// =============================================================================

/// The conversational entrypoint.
pub struct Agent {
    inner: Arc<AgentInner>,
    workers: Mutex<HashMap<SessionId, mpsc::Sender<Job>>>,
}

struct AgentInner {
    classifier: IntentClassifier,
    index: Arc<SharedKnowledgeIndex>,
    catalog: Arc<ProductCatalog>,
    engine: DesignSuggestionEngine,
    provider: Option<Arc<dyn GenerationProvider>>,
    composer: ResponseComposer,
    memory: Mutex<ConversationMemory>,
    config: StyleBotConfig,
    diagnostics: broadcast::Sender<Diagnostic>,
}

impl Agent {
    pub fn builder(config: StyleBotConfig) -> AgentBuilder {
        AgentBuilder::new(config)
    }

    /// Handle one user message. Never fails: degraded stages fall back to
    /// safe defaults and are reported as [`Diagnostic`]s.
    pub async fn handle_message(&self, session_id: &SessionId, text: &str) -> ChatReply {
        let text = truncate_message(text);

        // One retry covers a worker that exited between lookup and send.
        for _ in 0..2 {
            let sender = self.worker_for(session_id);
            let (reply_tx, reply_rx) = oneshot::channel();
            let job = Job {
                text: text.clone(),
                reply: reply_tx,
            };
            if sender.send(job).await.is_err() {
                warn!(session_id = %session_id, "Session worker gone, restarting");
                self.drop_worker(session_id);
                continue;
            }
            match reply_rx.await {
                Ok(reply) => return reply,
                Err(_) => {
                    warn!(session_id = %session_id, "Session worker dropped the reply");
                    break;
                }
            }
        }

        self.inner.publish(Diagnostic::StageDegraded {
            session_id: session_id.clone(),
            phase: TurnPhase::Idle,
            reason: "session worker unavailable".to_string(),
            timestamp: Utc::now(),
        });
        ChatReply {
            session_id: session_id.clone(),
            response_text: FALLBACK_TEXT.to_string(),
            intent: Intent::GeneralChat,
            source_labels: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Retained turns, most recent last.
    pub fn history(&self, session_id: &SessionId) -> Result<Vec<Turn>, ChatError> {
        let memory = self.inner.lock_memory()?;
        if !memory.contains(session_id) {
            return Err(ChatError::SessionNotFound(session_id.clone()));
        }
        Ok(memory.history(session_id))
    }

    pub fn stats(&self, session_id: &SessionId) -> Result<SessionStats, ChatError> {
        self.inner
            .lock_memory()?
            .stats(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.clone()))
    }

    /// Forget the turn history of a session but keep it alive.
    pub fn clear_history(&self, session_id: &SessionId) -> Result<(), ChatError> {
        if self.inner.lock_memory()?.clear(session_id) {
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.clone()))
        }
    }

    /// Evict a session: its worker stops once queued turns are done and its
    /// memory is dropped.
    pub fn end_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
        let had_worker = self.drop_worker(session_id);
        let had_memory = self.inner.lock_memory()?.remove(session_id);
        if had_worker || had_memory {
            info!(session_id = %session_id, "Session ended");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.clone()))
        }
    }

    /// Trending design ideas; empty when design suggestions are switched off.
    pub fn trending(&self, count: usize) -> Vec<DesignSuggestion> {
        if !self.inner.config.features.design_enabled {
            return Vec::new();
        }
        self.inner.engine.trending(count)
    }

    /// Subscribe to diagnostics from degraded turns.
    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        self.inner.diagnostics.subscribe()
    }

    /// Handle for swapping in a rebuilt knowledge index.
    pub fn knowledge(&self) -> &Arc<SharedKnowledgeIndex> {
        &self.inner.index
    }

    pub fn config(&self) -> &StyleBotConfig {
        &self.inner.config
    }

    pub fn provider_name(&self) -> &str {
        self.inner
            .provider
            .as_ref()
            .map(|p| p.name())
            .unwrap_or("none")
    }

    /// Number of sessions with a live worker.
    pub fn active_sessions(&self) -> usize {
        self.lock_workers().len()
    }

    // -- Private helpers --

    fn lock_workers(&self) -> MutexGuard<'_, HashMap<SessionId, mpsc::Sender<Job>>> {
        self.workers.lock().unwrap_or_else(|e| {
            warn!("Worker map lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn worker_for(&self, session_id: &SessionId) -> mpsc::Sender<Job> {
        let mut workers = self.lock_workers();
        if let Some(sender) = workers.get(session_id) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }

        let (tx, rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
        let inner = Arc::clone(&self.inner);
        let sid = session_id.clone();
        tokio::spawn(async move { inner.run_worker(sid, rx).await });
        debug!(session_id = %session_id, "Session worker started");

        workers.insert(session_id.clone(), tx.clone());
        tx
    }

    fn drop_worker(&self, session_id: &SessionId) -> bool {
        self.lock_workers().remove(session_id).is_some()
    }
}

impl AgentInner {
    async fn run_worker(self: Arc<Self>, session_id: SessionId, mut rx: mpsc::Receiver<Job>) {
        while let Some(job) = rx.recv().await {
            let reply = self.run_turn(&session_id, &job.text).await;
            if job.reply.send(reply).is_err() {
                debug!(session_id = %session_id, "Caller went away; turn committed anyway");
            }
        }
        debug!(session_id = %session_id, "Session worker stopped");
    }

    fn lock_memory(&self) -> Result<MutexGuard<'_, ConversationMemory>, ChatError> {
        self.memory
            .lock()
            .map_err(|e| ChatError::StatePoisoned(e.to_string()))
    }

    /// Memory access from inside a turn, where there is no caller to report
    /// a poisoned lock to.
    fn memory(&self) -> MutexGuard<'_, ConversationMemory> {
        self.memory.lock().unwrap_or_else(|e| {
            warn!("Memory lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn publish(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::RetrievalMiss { .. } | Diagnostic::FeatureDisabled { .. } => {
                debug!(
                    session_id = %diagnostic.session_id(),
                    kind = diagnostic.kind(),
                    "Turn diagnostic"
                );
            }
            _ => {
                warn!(
                    session_id = %diagnostic.session_id(),
                    kind = diagnostic.kind(),
                    ?diagnostic,
                    "Turn degraded"
                );
            }
        }
        // No subscribers is fine.
        let _ = self.diagnostics.send(diagnostic);
    }

    fn feature_disabled(&self, session_id: &SessionId, feature: &str) {
        self.publish(Diagnostic::FeatureDisabled {
            session_id: session_id.clone(),
            feature: feature.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Idle -> Classifying -> Dispatching -> Composing -> Idle.
    async fn run_turn(&self, session_id: &SessionId, text: &str) -> ChatReply {
        let started = Instant::now();
        let features = &self.config.features;

        // -- Classifying --
        let mut phase = TurnPhase::Classifying;
        let classified = self.classifier.classify_scored(text);
        let intent = classified.intent;
        debug!(
            session_id = %session_id,
            ?phase,
            intent = %intent,
            confidence = classified.confidence,
            "Intent classified"
        );

        // -- Dispatching --
        phase = TurnPhase::Dispatching;
        let (history, previous_user) = {
            let memory = self.memory();
            (
                memory.recent(session_id, self.config.memory.context_turns),
                memory.last_user_message(session_id),
            )
        };

        let mut chunks: Vec<ContextChunk> = Vec::new();
        let mut products: Vec<Product> = Vec::new();
        let mut suggestions: Vec<DesignSuggestion> = Vec::new();
        let mut refined = false;
        let mut design_disabled = false;

        if intent.uses_retrieval() {
            let query = match previous_user {
                Some(previous) if PRONOUN_RE.is_match(text) => format!("{} {}", previous, text),
                _ => text.to_string(),
            };
            if features.rag_enabled {
                chunks = self.retrieve(session_id, &query, phase).await;
            } else {
                self.feature_disabled(session_id, "rag");
            }
            if intent == Intent::ProductInquiry {
                products = self
                    .catalog
                    .lookup(&query)
                    .into_iter()
                    .take(MAX_PRODUCTS_PER_REPLY)
                    .cloned()
                    .collect();
            }
        } else if intent == Intent::DesignConsultation {
            if !features.design_enabled {
                design_disabled = true;
                self.feature_disabled(session_id, "design");
            } else {
                let target = if reads_as_feedback(text) {
                    self.memory().resolve_refinement_target(session_id, text)
                } else {
                    None
                };
                match target {
                    Some(target) => {
                        let refinement = self.engine.refine(&target, text);
                        debug!(
                            session_id = %session_id,
                            parent = %target.id,
                            child = %refinement.id,
                            "Design refined"
                        );
                        suggestions.push(refinement);
                        refined = true;
                    }
                    None => {
                        suggestions = self.engine.generate(
                            text,
                            self.config.design.max_suggestions,
                            self.config.design.creativity,
                        );
                    }
                }
            }
        }

        let mut source_labels: Vec<String> = Vec::new();
        for chunk in &chunks {
            if !source_labels.contains(&chunk.source_label) {
                source_labels.push(chunk.source_label.clone());
            }
        }

        // -- Composing --
        phase = TurnPhase::Composing;
        debug!(session_id = %session_id, ?phase, hits = chunks.len(), "Composing reply");
        let ctx = TurnContext {
            intent,
            message: text,
            chunks: &chunks,
            products: &products,
            suggestions: &suggestions,
            refined,
            design_disabled,
            history: &history,
        };
        let response_text = match self.generate(session_id, &ctx).await {
            Some(text) => text,
            None => self.composer.template(&ctx),
        };

        // -- Commit --
        {
            let mut memory = self.memory();
            memory.append(session_id, Turn::user(text, intent));
            memory.append(
                session_id,
                Turn::assistant(response_text.clone(), intent, source_labels.clone()),
            );
            if refined {
                if let Some(refinement) = suggestions.first() {
                    memory.replace_active_suggestion(session_id, refinement.clone());
                }
            } else if !suggestions.is_empty() {
                memory.set_active_suggestions(session_id, suggestions.clone());
            }
        }

        phase = TurnPhase::Idle;
        info!(
            session_id = %session_id,
            ?phase,
            intent = %intent,
            hits = chunks.len(),
            products = products.len(),
            suggestions = suggestions.len(),
            refined,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn complete"
        );

        ChatReply {
            session_id: session_id.clone(),
            response_text,
            intent,
            source_labels,
            suggestions,
        }
    }

    async fn retrieve(&self, session_id: &SessionId, query: &str, phase: TurnPhase) -> Vec<ContextChunk> {
        let retrieval = &self.config.retrieval;
        let index = self.index.snapshot();
        match index
            .retrieve(query, retrieval.top_k, retrieval.similarity_threshold)
            .await
        {
            Ok(chunks) if chunks.is_empty() => {
                self.publish(Diagnostic::RetrievalMiss {
                    session_id: session_id.clone(),
                    query: query.to_string(),
                    timestamp: Utc::now(),
                });
                chunks
            }
            Ok(chunks) => chunks,
            Err(e) => {
                self.publish(Diagnostic::StageDegraded {
                    session_id: session_id.clone(),
                    phase,
                    reason: format!("retrieval failed: {}", e),
                    timestamp: Utc::now(),
                });
                Vec::new()
            }
        }
    }

    /// Provider text for the turn, or `None` to use the template.
    async fn generate(&self, session_id: &SessionId, ctx: &TurnContext<'_>) -> Option<String> {
        let provider = self.provider.as_ref()?;
        if !self.composer.wants_provider(ctx) {
            return None;
        }

        let prompt = self.composer.prompt(ctx);
        let params = GenerationParams::from(&self.config.generation);
        let timeout_secs = self.config.generation.timeout_secs;

        let outcome = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            provider.generate(&prompt, ctx.chunks, params),
        )
        .await;

        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                self.publish(Diagnostic::StageDegraded {
                    session_id: session_id.clone(),
                    phase: TurnPhase::Composing,
                    reason: "provider returned empty text".to_string(),
                    timestamp: Utc::now(),
                });
                None
            }
            Ok(Err(e)) if e.is_quiet() => {
                debug!(session_id = %session_id, provider = provider.name(), reason = %e, "Provider declined");
                None
            }
            Ok(Err(e)) => {
                self.publish(Diagnostic::ProviderFailed {
                    session_id: session_id.clone(),
                    provider: provider.name().to_string(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                None
            }
            Err(_) => {
                self.publish(Diagnostic::ProviderTimedOut {
                    session_id: session_id.clone(),
                    provider: provider.name().to_string(),
                    timeout_secs,
                    timestamp: Utc::now(),
                });
                None
            }
        }
    }
}

fn truncate_message(text: &str) -> String {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => {
            warn!(max = MAX_MESSAGE_CHARS, "Message truncated");
            text[..cut].to_string()
        }
        None => text.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
