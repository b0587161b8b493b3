//! Bounded per-session conversation memory.
//!
//! Each session keeps at most `max_turns` turns (oldest evicted first) and
//! the most recent batch of design suggestions. The store itself is not
//! synchronised; the agent guards it with a mutex and only holds the lock
//! for the duration of a single call.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use stylebot_core::config::MemoryConfig;
use stylebot_core::types::{DesignSuggestion, Role, SessionId, SessionStats, Turn};

static NUMBERED_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:option|design|number|no\.?)\s*|#)(\d{1,2})\b")
        .expect("Invalid ordinal regex")
});

static WORD_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(first|second|third|fourth|fifth|last)\s+(?:one|option|design|idea)\b")
        .expect("Invalid ordinal regex")
});

#[derive(Debug)]
struct Session {
    turns: VecDeque<Turn>,
    active_suggestions: Vec<DesignSuggestion>,
    started_at: DateTime<Utc>,
    interaction_count: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            turns: VecDeque::new(),
            active_suggestions: Vec::new(),
            started_at: Utc::now(),
            interaction_count: 0,
        }
    }
}

/// Turn history and active suggestions for every live session.
#[derive(Debug)]
pub struct ConversationMemory {
    sessions: HashMap<SessionId, Session>,
    max_turns: usize,
    enabled: bool,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default(), true)
    }
}

impl ConversationMemory {
    /// Memory retaining up to `max_turns` turns per session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_turns: max_turns.max(1),
            enabled: true,
        }
    }

    /// Memory that tracks session counters but retains no turns or
    /// suggestions.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(1)
        }
    }

    pub fn from_config(config: &MemoryConfig, enabled: bool) -> Self {
        if enabled {
            Self::new(config.max_turns)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn session_mut(&mut self, session_id: &SessionId) -> &mut Session {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(Session::new)
    }

    /// Append a turn, evicting the oldest once the bound is reached.
    /// Creates the session on first use.
    pub fn append(&mut self, session_id: &SessionId, turn: Turn) {
        let enabled = self.enabled;
        let max_turns = self.max_turns;
        let session = self.session_mut(session_id);

        if turn.role == Role::User {
            session.interaction_count += 1;
        }
        if !enabled {
            return;
        }

        session.turns.push_back(turn);
        while session.turns.len() > max_turns {
            session.turns.pop_front();
        }
    }

    /// Retained turns, most recent last. Empty for unknown sessions.
    pub fn history(&self, session_id: &SessionId) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|s| s.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `k` retained turns, most recent last.
    pub fn recent(&self, session_id: &SessionId, k: usize) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|s| {
                let skip = s.turns.len().saturating_sub(k);
                s.turns.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Text of the most recent user turn.
    pub fn last_user_message(&self, session_id: &SessionId) -> Option<String> {
        self.sessions.get(session_id).and_then(|s| {
            s.turns
                .iter()
                .rev()
                .find(|t| t.role == Role::User)
                .map(|t| t.text.clone())
        })
    }

    pub fn active_suggestions(&self, session_id: &SessionId) -> Vec<DesignSuggestion> {
        self.sessions
            .get(session_id)
            .map(|s| s.active_suggestions.clone())
            .unwrap_or_default()
    }

    /// Replace the active batch wholesale.
    pub fn set_active_suggestions(&mut self, session_id: &SessionId, batch: Vec<DesignSuggestion>) {
        if !self.enabled {
            return;
        }
        debug!(session_id = %session_id, count = batch.len(), "Active suggestions replaced");
        self.session_mut(session_id).active_suggestions = batch;
    }

    /// Put a refinement in its parent's slot so later ordinals keep pointing
    /// at the same options. A parent no longer in the batch makes the
    /// refinement the whole batch.
    pub fn replace_active_suggestion(&mut self, session_id: &SessionId, refined: DesignSuggestion) {
        if !self.enabled {
            return;
        }
        let batch = &mut self.session_mut(session_id).active_suggestions;
        let slot = refined
            .parent_suggestion_id
            .and_then(|parent| batch.iter().position(|s| s.id == parent));
        match slot {
            Some(index) => {
                debug!(session_id = %session_id, index, "Active suggestion refined in place");
                batch[index] = refined;
            }
            None => *batch = vec![refined],
        }
    }

    /// The suggestion a feedback message refers to.
    ///
    /// An ordinal ("option 2", "#2", "the second one", "the last one") picks
    /// from the most recent batch; no ordinal, or one outside the batch,
    /// falls back to the first suggestion.
    pub fn resolve_refinement_target(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Option<DesignSuggestion> {
        let batch = &self.sessions.get(session_id)?.active_suggestions;
        if batch.is_empty() {
            return None;
        }
        let index = referenced_index(text, batch.len())
            .filter(|i| *i < batch.len())
            .unwrap_or(0);
        batch.get(index).cloned()
    }

    pub fn stats(&self, session_id: &SessionId) -> Option<SessionStats> {
        self.sessions.get(session_id).map(|s| SessionStats {
            session_id: session_id.clone(),
            started_at: s.started_at,
            duration_secs: (Utc::now() - s.started_at).num_seconds(),
            interaction_count: s.interaction_count,
            retained_turns: s.turns.len(),
            active_suggestions: s.active_suggestions.len(),
        })
    }

    /// Drop the turn history but keep the session and its counters.
    /// Returns false for unknown sessions.
    pub fn clear(&mut self, session_id: &SessionId) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.turns.clear();
                true
            }
            None => false,
        }
    }

    /// Forget a session entirely.
    pub fn remove(&mut self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Zero-based index named by an ordinal reference in `text`.
pub fn referenced_index(text: &str, batch_len: usize) -> Option<usize> {
    if let Some(caps) = NUMBERED_REF_RE.captures(text) {
        let n: usize = caps[1].parse().ok()?;
        return n.checked_sub(1);
    }
    let caps = WORD_REF_RE.captures(text)?;
    match caps[1].to_lowercase().as_str() {
        "first" => Some(0),
        "second" => Some(1),
        "third" => Some(2),
        "fourth" => Some(3),
        "fifth" => Some(4),
        "last" => batch_len.checked_sub(1),
        _ => None,
    }
}
