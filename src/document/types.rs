//! Document tracking types

use std::path::PathBuf;

use serde::Serialize;

use crate::assembly::{ImageFormat, DEFAULT_TILES_PER_PAGE};
use crate::exchange::ExchangeKind;
use crate::types::{DocumentId, PageIndex};

/// Title, author and page count from the metadata exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub total_pages: u32,
}

/// Settings shared by every tracker in a pool
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Tiles per page (N)
    pub tiles_per_page: usize,
    pub image_format: ImageFormat,
    pub quality: u8,
    /// Root of the per-document page directories
    pub image_dir: PathBuf,
    /// Where finished documents are written
    pub output_dir: PathBuf,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tiles_per_page: DEFAULT_TILES_PER_PAGE,
            image_format: ImageFormat::default(),
            quality: 85,
            image_dir: PathBuf::from("./book_images"),
            output_dir: PathBuf::from("./download_book"),
        }
    }
}

/// Result of handing a tile to a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Slot out of range, or the page/document is already finalized
    Rejected,
    /// Stored; the page still needs more tiles
    Pending { filled: usize, capacity: usize },
    /// The page was composed and persisted
    PageCompleted {
        page: PageIndex,
        finalized: usize,
        total: Option<u32>,
    },
    /// The page had every tile but could not be composed or written; its
    /// tiles were discarded so the page can be fetched again
    PageFailed { page: PageIndex },
    /// This tile completed the last page and finalization was dispatched
    DocumentCompleted { page: PageIndex },
}

/// Result of handing metadata to a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Metadata was already set
    Unchanged,
    Applied,
    /// Applied, and every page was already saved in this run, so
    /// finalization was dispatched
    DocumentCompleted,
}

impl From<MetadataOutcome> for ExchangeOutcome {
    fn from(outcome: MetadataOutcome) -> Self {
        match outcome {
            MetadataOutcome::Unchanged => ExchangeOutcome::Unchanged,
            MetadataOutcome::Applied => ExchangeOutcome::Applied,
            MetadataOutcome::DocumentCompleted => ExchangeOutcome::DocumentCompleted,
        }
    }
}

/// What the pool did with one intercepted exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeOutcome {
    /// URL matched no exchange kind
    Ignored,
    /// Document not wanted, already finished, or page already finalized
    Filtered,
    /// URL parameters or body could not be parsed
    Malformed,
    /// Token or payload could not be decoded
    Miss,
    /// Pre-tile response with empty data
    Empty,
    /// Pre-tile announcement recorded in the order table
    Recorded,
    /// Tile token had no pending announcement
    Unresolved,
    /// Resolved slot outside the page
    Rejected,
    /// Tile stored, page still filling
    TileStored,
    PageCompleted,
    PageFailed,
    DocumentCompleted,
    /// Metadata or bookmark applied
    Applied,
    /// Metadata or bookmark already known
    Unchanged,
}

impl From<&SubmitOutcome> for ExchangeOutcome {
    fn from(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Rejected => ExchangeOutcome::Rejected,
            SubmitOutcome::Pending { .. } => ExchangeOutcome::TileStored,
            SubmitOutcome::PageCompleted { .. } => ExchangeOutcome::PageCompleted,
            SubmitOutcome::PageFailed { .. } => ExchangeOutcome::PageFailed,
            SubmitOutcome::DocumentCompleted { .. } => ExchangeOutcome::DocumentCompleted,
        }
    }
}

/// Classification plus outcome of a routed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutedExchange {
    pub kind: Option<ExchangeKind>,
    pub outcome: ExchangeOutcome,
}

/// Point-in-time view of one tracked document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub document_id: DocumentId,
    pub metadata: Option<DocumentMetadata>,
    pub finalized_pages: usize,
    pub pages_in_progress: usize,
    /// Empty until the page count is known
    pub missing_pages: Vec<PageIndex>,
    pub has_bookmark: bool,
    pub finalize_dispatched: bool,
    pub page_dir: PathBuf,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub documents: Vec<DocumentSnapshot>,
    pub finished: Vec<DocumentId>,
    pub pending_orders: usize,
}
