//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use stylebot_chat::Agent;

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    /// For uptime reporting.
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self::from_shared(Arc::new(agent))
    }

    /// Wrap an agent that is also used elsewhere, e.g. by the REPL.
    pub fn from_shared(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}
