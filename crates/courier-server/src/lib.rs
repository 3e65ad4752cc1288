//! Courier server library logic.
//!
//! A thin JSON API in front of a bus-driven conversational agent. Each
//! conversational request is correlated with its asynchronous reply by the
//! [`courier_broker::Broker`] inside [`channel::HttpChannel`].

pub mod api;
pub mod api_chat;
pub mod api_upload;
pub mod api_workspace;
pub mod background;
pub mod bus;
pub mod channel;
pub mod config;
pub mod loopback;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use channel::HttpChannel;
use config::AgentConfig;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request/reply bridge to the agent.
    pub channel: Arc<HttpChannel>,
    /// Agent workspace (storage root). `None` disables uploads.
    pub workspace: Option<PathBuf>,
    /// Exchange timeouts and the reset command.
    pub agent: AgentConfig,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "channel": courier_types::HTTP_CHANNEL
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(api_chat::chat_handler))
        .route("/uploads", post(api_upload::uploads_handler))
        .route("/memory", get(api_workspace::memory_handler))
        .route("/files", get(api_workspace::files_handler))
        .route(
            "/conversations",
            delete(api_chat::clear_conversations_handler),
        )
        .fallback(api::not_found_handler)
        .method_not_allowed_fallback(api::method_not_allowed_handler)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::cors_middleware))
        .layer(Extension(Arc::new(state)))
}
