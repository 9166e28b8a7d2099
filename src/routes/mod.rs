//! HTTP route handlers

pub mod documents;
pub mod exchanges;
pub mod health;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/exchanges", exchanges::router())
        .nest("/api/v1/documents", documents::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
