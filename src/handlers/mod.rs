// Handlers Module
// This module contains the API endpoint handlers and the router

pub mod graph_status;
pub mod health;

use axum::http::Uri;
use axum::routing::{get, Router};
use std::sync::Arc;

use crate::config::SourcesConfig;
use crate::error::ApiError;
use crate::services::GraphStatusService;

pub use graph_status::graph_status_stream;
pub use health::health_check;

/// Shared state of the HTTP layer
pub struct AppContext {
    pub sources: SourcesConfig,
    pub status: Arc<GraphStatusService>,
}

// Type alias for the application state
pub type AppState = Arc<AppContext>;

/// Routes exposed by the server, without middleware layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/graph-status-stream", get(graph_status_stream))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
