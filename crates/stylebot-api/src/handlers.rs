//! Route handler functions for all API endpoints.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use stylebot_core::types::{ChatReply, DesignSuggestion, SessionId, SessionStats, Turn};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_TRENDING_COUNT: usize = 5;

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a new session.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: SessionId,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub suggestions: Vec<DesignSuggestion>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub provider: String,
    pub knowledge_chunks: usize,
    pub knowledge_version: u64,
    pub active_sessions: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /chat - handle one message.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let session_id = match req.session_id {
        Some(id) if !id.trim().is_empty() => SessionId::from(id),
        _ => SessionId::new(),
    };

    let reply = state.agent.handle_message(&session_id, &req.message).await;
    Ok(Json(reply))
}

/// GET /sessions/{id}/history - retained turns, most recent last.
pub async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = SessionId::from(id);
    let turns = state.agent.history(&session_id)?;
    Ok(Json(HistoryResponse { session_id, turns }))
}

/// DELETE /sessions/{id}/history - forget turns but keep the session.
pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.agent.clear_history(&SessionId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/{id}/stats
pub async fn session_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStats>, ApiError> {
    Ok(Json(state.agent.stats(&SessionId::from(id))?))
}

/// DELETE /sessions/{id} - end a session.
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.agent.end_session(&SessionId::from(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /designs/trending?count=N
pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Json<TrendingResponse> {
    let count = params.count.unwrap_or(DEFAULT_TRENDING_COUNT);
    Json(TrendingResponse {
        suggestions: state.agent.trending(count),
    })
}

/// GET /diagnostics - SSE stream of degraded-turn diagnostics.
pub async fn diagnostics(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.agent.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(diagnostic) => {
            let data = serde_json::to_string(&diagnostic).unwrap_or_default();
            Some(Ok(Event::default().event(diagnostic.kind()).data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let knowledge = state.agent.knowledge();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        uptime_secs: state.start_time.elapsed().as_secs(),
        provider: state.agent.provider_name().to_string(),
        knowledge_chunks: knowledge.snapshot().len(),
        knowledge_version: knowledge.version(),
        active_sessions: state.agent.active_sessions(),
    })
}
