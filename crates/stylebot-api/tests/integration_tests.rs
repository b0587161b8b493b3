//! Integration tests for the StyleBot API.
//!
//! Every test builds its own agent over a small in-memory knowledge base and
//! drives the router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use stylebot_api::create_router;
use stylebot_api::error::ErrorBody;
use stylebot_api::handlers::{HealthResponse, HistoryResponse, TrendingResponse};
use stylebot_api::state::AppState;
use stylebot_chat::Agent;
use stylebot_core::config::StyleBotConfig;
use stylebot_core::types::{ChatReply, Intent, SessionStats, SourceDocument};
use stylebot_knowledge::{
    ChunkingConfig, KnowledgeIndex, LexicalEmbedding, ProductCatalog, SharedKnowledgeIndex,
};

// =============================================================================
// Helpers
// =============================================================================

const FAQ: &str = "## Returns\nWe offer a 30-day return policy on unworn items. \
    Custom designed items are non-returnable unless they arrive defective.";

const SHIPPING: &str = "## Shipping\nStandard shipping takes 5-7 business days. \
    Express shipping takes 2-3 business days and costs $15.";

const CATALOG: &str = r#"[
    {
        "id": "hoodie-classic",
        "name": "Classic Pullover Hoodie",
        "category": "hoodies",
        "price": 44.99,
        "colors": ["red", "black"],
        "sizes": ["S", "M", "L", "XL"],
        "material": "80% cotton fleece"
    }
]"#;

/// Build an agent over the test knowledge base, with no generation provider.
async fn make_state() -> AppState {
    let mut config = StyleBotConfig::default();
    config.retrieval.similarity_threshold = 0.1;
    config.design.seed = Some(11);

    let catalog = ProductCatalog::from_json(CATALOG).unwrap();
    let mut docs = vec![
        SourceDocument::new("faq.md", FAQ),
        SourceDocument::new("shipping.md", SHIPPING),
    ];
    docs.extend(catalog.documents());
    let index = KnowledgeIndex::build(
        &docs,
        Arc::new(LexicalEmbedding::default()),
        ChunkingConfig::default(),
    )
    .await
    .unwrap();

    let agent = Agent::builder(config)
        .index(Arc::new(SharedKnowledgeIndex::new(index)))
        .catalog(Arc::new(catalog))
        .without_provider()
        .build()
        .unwrap();
    AppState::new(agent)
}

async fn make_app() -> axum::Router {
    create_router(make_state().await)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

/// Send one chat message and return the decoded reply.
async fn chat(app: &axum::Router, session_id: &str, message: &str) -> ChatReply {
    let body = serde_json::json!({ "session_id": session_id, "message": message }).to_string();
    let resp = app.clone().oneshot(post_json("/chat", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_knowledge_and_provider() {
    let app = make_app().await;
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.provider, "none");
    assert!(health.knowledge_chunks > 0);
    assert_eq!(health.active_sessions, 0);
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_faq_cites_sources() {
    let app = make_app().await;
    let reply = chat(&app, "s1", "What is your return policy?").await;

    assert_eq!(reply.intent, Intent::Faq);
    assert_eq!(reply.session_id.as_str(), "s1");
    assert!(reply.source_labels.iter().any(|l| l == "faq.md"));
    assert!(reply.response_text.contains("30-day"));
}

#[tokio::test]
async fn test_chat_without_session_id_creates_one() {
    let app = make_app().await;
    let resp = app
        .clone()
        .oneshot(post_json("/chat", r#"{"message": "hello there"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let reply: ChatReply = body_json(resp).await;
    assert!(!reply.session_id.as_str().is_empty());
    assert_eq!(reply.intent, Intent::GeneralChat);

    let uri = format!("/sessions/{}/history", reply.session_id.as_str());
    let resp = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let app = make_app().await;
    let resp = app
        .oneshot(post_json("/chat", r#"{"session_id": "s1", "message": "   "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.error, "bad_request");
}

#[tokio::test]
async fn test_chat_malformed_body_is_rejected() {
    let app = make_app().await;
    let resp = app
        .oneshot(post_json("/chat", r#"{"session_id": "s1"}"#))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_chat_design_request_returns_suggestions() {
    let app = make_app().await;
    let reply = chat(&app, "s1", "Can you suggest a design for my hoodie?").await;

    assert_eq!(reply.intent, Intent::DesignConsultation);
    assert!(!reply.suggestions.is_empty());
    assert!(reply.response_text.contains("Option 1"));
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_history_lists_turns_in_order() {
    let app = make_app().await;
    chat(&app, "s1", "hi").await;
    chat(&app, "s1", "How long does shipping take?").await;

    let resp = app.oneshot(get("/sessions/s1/history")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let history: HistoryResponse = body_json(resp).await;
    assert_eq!(history.session_id.as_str(), "s1");
    assert_eq!(history.turns.len(), 4);
    assert_eq!(history.turns[0].text, "hi");
    assert_eq!(history.turns[2].text, "How long does shipping take?");
}

#[tokio::test]
async fn test_stats_count_interactions() {
    let app = make_app().await;
    chat(&app, "s1", "hi").await;
    chat(&app, "s1", "thanks").await;

    let resp = app.oneshot(get("/sessions/s1/stats")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stats: SessionStats = body_json(resp).await;
    assert_eq!(stats.interaction_count, 2);
    assert_eq!(stats.retained_turns, 4);
}

#[tokio::test]
async fn test_clear_history_keeps_session() {
    let app = make_app().await;
    chat(&app, "s1", "hi").await;

    let resp = app
        .clone()
        .oneshot(delete("/sessions/s1/history"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/sessions/s1/history")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let history: HistoryResponse = body_json(resp).await;
    assert!(history.turns.is_empty());
}

#[tokio::test]
async fn test_end_session_removes_it() {
    let app = make_app().await;
    chat(&app, "s1", "hi").await;

    let resp = app.clone().oneshot(delete("/sessions/s1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/sessions/s1/history")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = make_app().await;

    for req in [
        get("/sessions/nope/history"),
        get("/sessions/nope/stats"),
        delete("/sessions/nope/history"),
        delete("/sessions/nope"),
    ] {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = body_json(resp).await;
        assert_eq!(body["error"], "not_found");
    }
}

// =============================================================================
// Designs and diagnostics
// =============================================================================

#[tokio::test]
async fn test_trending_honours_count() {
    let app = make_app().await;
    let resp = app
        .clone()
        .oneshot(get("/designs/trending?count=3"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let trending: TrendingResponse = body_json(resp).await;
    assert_eq!(trending.suggestions.len(), 3);

    let resp = app.oneshot(get("/designs/trending")).await.unwrap();
    let trending: TrendingResponse = body_json(resp).await;
    assert_eq!(trending.suggestions.len(), 5);
}

#[tokio::test]
async fn test_diagnostics_is_event_stream() {
    let app = make_app().await;
    let resp = app.oneshot(get("/diagnostics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}
