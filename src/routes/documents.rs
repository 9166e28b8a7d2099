//! Tracking status

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::document::{DocumentSnapshot, PoolSnapshot};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::types::DocumentId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents))
        .route("/:id", get(get_document))
}

async fn list_documents(State(state): State<AppState>) -> Json<PoolSnapshot> {
    Json(state.pool().snapshot())
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<DocumentSnapshot>> {
    state
        .pool()
        .snapshot()
        .documents
        .into_iter()
        .find(|doc| doc.document_id == id)
        .map(Json)
        .ok_or_else(|| {
            if state.pool().is_finished(id) {
                AppError::NotFound(format!("Document {} is finished", id))
            } else {
                AppError::NotFound(format!("Document {} is not tracked", id))
            }
        })
}
