//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use stylebot_core::error::StyleBotError;

use crate::handlers;
use crate::state::AppState;

/// Chat messages are capped well below this; it only stops abuse.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Allow browser clients served from localhost on the API port and the
    // port above it (dev server).
    let port = state.agent.config().server.port;
    let origins: Vec<HeaderValue> = [port, port.saturating_add(1)]
        .iter()
        .flat_map(|p| [format!("http://127.0.0.1:{}", p), format!("http://localhost:{}", p)])
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/sessions/{id}", delete(handlers::end_session))
        .route(
            "/sessions/{id}/history",
            get(handlers::session_history).delete(handlers::clear_history),
        )
        .route("/sessions/{id}/stats", get(handlers::session_stats))
        .route("/designs/trending", get(handlers::trending))
        .layer(CompressionLayer::new());

    // SSE is left uncompressed so events flush immediately.
    let stream_routes = Router::new()
        .route("/diagnostics", get(handlers::diagnostics))
        .route("/health", get(handlers::health));

    api_routes
        .merge(stream_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on 127.0.0.1 at the configured port until the server
/// stops.
pub async fn start_server(state: AppState) -> Result<(), StyleBotError> {
    let addr = format!("127.0.0.1:{}", state.agent.config().server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StyleBotError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| StyleBotError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
