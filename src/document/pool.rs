//! The set of documents being tracked

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::error::StoreResult;
use super::tracker::DocumentTracker;
use super::types::{PoolSnapshot, TrackerSettings};
use crate::exchange::UrlPatterns;
use crate::finalize::DocumentFinalizer;
use crate::order::OrderTable;
use crate::types::{DocumentId, PageIndex};

/// Shared handle to every tracked document, the order table and the
/// exchange classifier. Cheap to clone; created once at startup.
#[derive(Clone)]
pub struct DocumentPool {
    inner: Arc<DocumentPoolInner>,
}

struct DocumentPoolInner {
    /// Wanted documents still being assembled
    trackers: RwLock<HashMap<DocumentId, Arc<Mutex<DocumentTracker>>>>,

    /// Documents handed to the finalizer and evicted
    finished: RwLock<BTreeSet<DocumentId>>,

    orders: OrderTable,

    patterns: UrlPatterns,
}

impl DocumentPool {
    /// Open a tracker for each wanted document, picking up pages left on
    /// disk by a previous run.
    pub fn new(
        wanted: impl IntoIterator<Item = DocumentId>,
        settings: TrackerSettings,
        patterns: UrlPatterns,
        finalizer: Arc<dyn DocumentFinalizer>,
    ) -> StoreResult<Self> {
        let settings = Arc::new(settings);
        std::fs::create_dir_all(&settings.output_dir)?;

        let mut trackers = HashMap::new();
        for id in wanted {
            let tracker = DocumentTracker::open(id, settings.clone(), finalizer.clone())?;
            trackers.insert(id, Arc::new(Mutex::new(tracker)));
        }
        tracing::info!(documents = trackers.len(), "Document pool ready");

        Ok(Self {
            inner: Arc::new(DocumentPoolInner {
                trackers: RwLock::new(trackers),
                finished: RwLock::new(BTreeSet::new()),
                orders: OrderTable::new(),
                patterns,
            }),
        })
    }

    pub fn orders(&self) -> &OrderTable {
        &self.inner.orders
    }

    pub fn patterns(&self) -> &UrlPatterns {
        &self.inner.patterns
    }

    pub(crate) fn tracker(&self, id: DocumentId) -> Option<Arc<Mutex<DocumentTracker>>> {
        self.inner.trackers.read().get(&id).cloned()
    }

    pub fn is_tracking(&self, id: DocumentId) -> bool {
        self.inner.trackers.read().contains_key(&id)
    }

    pub fn is_finished(&self, id: DocumentId) -> bool {
        self.inner.finished.read().contains(&id)
    }

    /// True when an exchange for `id` (and `page`, if given) should be
    /// skipped: not wanted, already finished, or the page is already
    /// persisted. Evaluated before any token is decoded.
    pub fn filter(&self, id: DocumentId, page: Option<PageIndex>) -> bool {
        if self.is_finished(id) {
            return true;
        }
        match self.tracker(id) {
            Some(tracker) => tracker.lock().filter(page),
            None => true,
        }
    }

    /// Stop tracking `id`. Later exchanges for it are filtered and its
    /// unresolved orders are dropped. Returns false if it was not tracked.
    pub fn evict(&self, id: DocumentId) -> bool {
        let removed = self.inner.trackers.write().remove(&id).is_some();
        if !removed {
            return false;
        }
        self.inner.finished.write().insert(id);
        let dropped_orders = self.inner.orders.forget_document(id);
        tracing::info!(document_id = id, dropped_orders, "Document evicted");
        true
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let trackers: Vec<_> = self.inner.trackers.read().values().cloned().collect();
        let mut documents: Vec<_> = trackers.iter().map(|t| t.lock().snapshot()).collect();
        documents.sort_by_key(|d| d.document_id);

        PoolSnapshot {
            documents,
            finished: self.inner.finished.read().iter().copied().collect(),
            pending_orders: self.inner.orders.pending_count(),
        }
    }
}
