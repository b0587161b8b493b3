use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Stage of the per-turn state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    Classifying,
    Dispatching,
    Composing,
}

/// Side-channel report of a degraded turn.
///
/// Published on the orchestrator's broadcast channel and logged at `warn`.
/// The reply to the user is always well formed; these exist so operators
/// can see what degraded and why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Diagnostic {
    /// The provider returned an error; the template composer answered instead.
    ProviderFailed {
        session_id: SessionId,
        provider: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The provider did not answer within `generation.timeout_secs`.
    ProviderTimedOut {
        session_id: SessionId,
        provider: String,
        timeout_secs: u64,
        timestamp: DateTime<Utc>,
    },

    /// Retrieval found nothing above the similarity threshold.
    RetrievalMiss {
        session_id: SessionId,
        query: String,
        timestamp: DateTime<Utc>,
    },

    /// A pipeline stage failed and fell back to a safe default.
    StageDegraded {
        session_id: SessionId,
        phase: TurnPhase,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A request needed a feature that is switched off.
    FeatureDisabled {
        session_id: SessionId,
        feature: String,
        timestamp: DateTime<Utc>,
    },
}

impl Diagnostic {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Diagnostic::ProviderFailed { session_id, .. }
            | Diagnostic::ProviderTimedOut { session_id, .. }
            | Diagnostic::RetrievalMiss { session_id, .. }
            | Diagnostic::StageDegraded { session_id, .. }
            | Diagnostic::FeatureDisabled { session_id, .. } => session_id,
        }
    }

    /// Short machine-readable name, used as the SSE event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::ProviderFailed { .. } => "provider_failed",
            Diagnostic::ProviderTimedOut { .. } => "provider_timed_out",
            Diagnostic::RetrievalMiss { .. } => "retrieval_miss",
            Diagnostic::StageDegraded { .. } => "stage_degraded",
            Diagnostic::FeatureDisabled { .. } => "feature_disabled",
        }
    }
}
