use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::query;
use crate::services::{LlmClientFactory, QueryEngine};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    /// Builds a model client per request from the caller's model name and key
    pub llm_factory: Arc<dyn LlmClientFactory>,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>, llm_factory: Arc<dyn LlmClientFactory>) -> Self {
        Self {
            engine,
            llm_factory,
        }
    }
}

/// Create router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(query::handle_get).post(query::handle_post))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
