//! Document persistence errors

use thiserror::Error;

use crate::assembly::AssemblyError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Composing or encoding a page failed
    #[error("Page assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
