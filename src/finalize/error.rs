//! Finalization errors

use std::path::PathBuf;

use thiserror::Error;

use crate::assembly::AssemblyError;

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("No page images with extension `{extension}` in {dir}")]
    NoPages { dir: PathBuf, extension: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load page image {path}: {source}")]
    PageImage {
        path: PathBuf,
        #[source]
        source: AssemblyError,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Bookmark error: {0}")]
    Bookmark(#[from] serde_json::Error),
}

pub type FinalizeResult<T> = std::result::Result<T, FinalizeError>;
