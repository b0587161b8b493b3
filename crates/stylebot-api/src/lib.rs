//! StyleBot API crate - axum HTTP surface over the chat agent.
//!
//! Exposes the chat entrypoint, session history and statistics, trending
//! designs, a server-sent-events stream of turn diagnostics and a health
//! check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
