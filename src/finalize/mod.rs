//! Document finalization
//!
//! Once every page of a document is persisted, the tracker hands a
//! [`FinalizeJob`] to a [`DocumentFinalizer`] and forgets about it. The
//! production finalizer is [`FinalizeQueue`], which writes the PDF on the
//! blocking pool; its outcome is only logged.

mod error;
mod outline;
mod pdf;
mod queue;

use std::path::PathBuf;

use serde_json::Value;

use crate::types::DocumentId;

pub use error::{FinalizeError, FinalizeResult};
pub use outline::{BookmarkNode, OutlineItem};
pub use pdf::{merge_directory, write_pdf, PdfSummary};
pub use queue::FinalizeQueue;

/// Everything needed to turn a page directory into the final document.
/// Owned by the finalizer once handed over.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeJob {
    pub document_id: DocumentId,
    pub page_dir: PathBuf,
    pub output_path: PathBuf,
    pub bookmark: Option<Value>,
    /// Extension of the persisted page images
    pub image_extension: String,
    /// JPEG quality used when a page has to be re-encoded for embedding
    pub quality: u8,
}

/// Receives completed documents. Must not block the caller.
pub trait DocumentFinalizer: Send + Sync {
    fn finalize(&self, job: FinalizeJob);
}

/// Strip characters that are not allowed in file names on common platforms
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name(r#"A/B\C:D*E?F"G<H>I|J"#), "ABCDEFGHIJ");
        assert_eq!(sanitize_file_name("数据结构 (第2版)"), "数据结构 (第2版)");
    }
}
