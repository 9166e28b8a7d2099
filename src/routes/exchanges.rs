//! Exchange ingestion
//!
//! The interception proxy forwards every response it matched:
//!
//! ```text
//! POST /api/v1/exchanges?url=<percent-encoded response URL>
//! <raw response body>
//! ```
//!
//! The exchange is always acknowledged with 202; the body reports how it
//! was classified and what the pool did with it.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::document::RoutedExchange;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(ingest_exchange))
}

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    pub url: String,
}

async fn ingest_exchange(
    State(state): State<AppState>,
    Query(query): Query<ExchangeQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<RoutedExchange>)> {
    if query.url.is_empty() {
        return Err(AppError::BadRequest("`url` must not be empty".to_string()));
    }

    // Page composition is CPU-bound
    let pool = state.pool().clone();
    let routed = tokio::task::spawn_blocking(move || pool.route(&query.url, &body))
        .await
        .map_err(|e| AppError::Internal(format!("Exchange task failed: {}", e)))?;

    Ok((StatusCode::ACCEPTED, Json(routed)))
}
