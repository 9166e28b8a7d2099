//! Tile order resolution
//!
//! Tiles arrive shuffled. Each tile is preceded by a pre-tile exchange that
//! announces a slot and, inside its encrypted payload, the resolution key
//! the matching tile will carry. This table remembers those announcements
//! until the tile shows up:
//!
//! ```text
//! document_id -> page_index -> resolution_key -> local_seq
//! ```
//!
//! Entries are consumed exactly once and empty page/document levels are
//! pruned, so memory is bounded by outstanding (unresolved) tiles.
//!
//! # Thread Safety
//!
//! One `parking_lot::Mutex` serializes the whole table. Contention is low
//! (tens of pages in flight) and a single lock rules out lost updates
//! between a `record` and a concurrent `resolve` + prune on the same page.

mod ingest;

pub use ingest::{PendingOrder, ResolvedOrder};

#[cfg(test)]
pub(crate) use ingest::fixtures;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{DocumentId, PageIndex, ResolutionKey};

type PageOrders = HashMap<ResolutionKey, u32>;
type DocumentOrders = HashMap<PageIndex, PageOrders>;

/// Process-wide pending-order table
#[derive(Clone, Default)]
pub struct OrderTable {
    inner: Arc<Mutex<HashMap<DocumentId, DocumentOrders>>>,
}

impl OrderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` resolves to `local_seq` on the given page.
    ///
    /// Last write wins: a repeated key overwrites its slot, and a slot that
    /// is re-announced under a new key drops the stale key so at most one
    /// entry exists per slot.
    pub fn record(
        &self,
        document_id: DocumentId,
        page_index: PageIndex,
        local_seq: u32,
        key: ResolutionKey,
    ) {
        let mut table = self.inner.lock();
        let page = table
            .entry(document_id)
            .or_default()
            .entry(page_index)
            .or_default();

        page.retain(|existing, seq| *seq != local_seq || *existing == key);
        page.insert(key, local_seq);
    }

    /// Look up and consume the slot for `key`.
    ///
    /// Returns `None` when nothing is pending for the key; that is a normal
    /// event under duplicated or reordered traffic.
    pub fn resolve(
        &self,
        document_id: DocumentId,
        page_index: PageIndex,
        key: &ResolutionKey,
    ) -> Option<u32> {
        let mut table = self.inner.lock();

        let document = table.get_mut(&document_id)?;
        let page = document.get_mut(&page_index)?;
        let local_seq = page.remove(key)?;

        if page.is_empty() {
            document.remove(&page_index);
        }
        if document.is_empty() {
            table.remove(&document_id);
        }

        Some(local_seq)
    }

    /// Drop every pending entry of a document. Returns how many were dropped.
    pub fn forget_document(&self, document_id: DocumentId) -> usize {
        self.inner
            .lock()
            .remove(&document_id)
            .map(|pages| pages.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    /// Pending entries for one page
    pub fn pending_for_page(&self, document_id: DocumentId, page_index: PageIndex) -> usize {
        self.inner
            .lock()
            .get(&document_id)
            .and_then(|pages| pages.get(&page_index))
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Whether the page-level map still exists
    pub fn has_page(&self, document_id: DocumentId, page_index: PageIndex) -> bool {
        self.inner
            .lock()
            .get(&document_id)
            .is_some_and(|pages| pages.contains_key(&page_index))
    }

    /// Whether the document-level map still exists
    pub fn has_document(&self, document_id: DocumentId) -> bool {
        self.inner.lock().contains_key(&document_id)
    }

    /// Total pending entries across all documents
    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .values()
            .flat_map(|pages| pages.values())
            .map(HashMap::len)
            .sum()
    }
}
