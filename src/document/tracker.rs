//! Per-document assembly state

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use super::error::StoreResult;
use super::store::PageStore;
use super::types::{
    DocumentMetadata, DocumentSnapshot, MetadataOutcome, SubmitOutcome, TrackerSettings,
};
use crate::assembly::{encode_page, PageAssembler};
use crate::finalize::{sanitize_file_name, DocumentFinalizer, FinalizeJob};
use crate::types::{DocumentId, PageIndex, SlotIndex};

/// Owns the pages of one document from first tile to finalization.
///
/// Not internally synchronized; the pool wraps each tracker in a mutex.
pub struct DocumentTracker {
    id: DocumentId,
    metadata: Option<DocumentMetadata>,
    bookmark: Option<Value>,
    pages: HashMap<PageIndex, PageAssembler>,
    finalized: BTreeSet<PageIndex>,
    /// Pages composed by this process, as opposed to found on disk
    saved_this_run: usize,
    store: PageStore,
    settings: Arc<TrackerSettings>,
    finalizer: Arc<dyn DocumentFinalizer>,
    finalize_dispatched: bool,
}

impl DocumentTracker {
    /// Open the page store for `id`; pages already on disk count as
    /// finalized.
    pub fn open(
        id: DocumentId,
        settings: Arc<TrackerSettings>,
        finalizer: Arc<dyn DocumentFinalizer>,
    ) -> StoreResult<Self> {
        let (store, finalized) =
            PageStore::open(&settings.image_dir, id, settings.image_format.extension())?;

        Ok(Self {
            id,
            metadata: None,
            bookmark: None,
            pages: HashMap::new(),
            finalized,
            saved_this_run: 0,
            store,
            settings,
            finalizer,
            finalize_dispatched: false,
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.metadata.as_ref()
    }

    fn total_pages(&self) -> Option<u32> {
        self.metadata
            .as_ref()
            .map(|m| m.total_pages)
            .filter(|&total| total > 0)
    }

    /// True when work for this document (or the given page) should be
    /// skipped: the document was handed to the finalizer, or the page is
    /// already persisted.
    pub fn filter(&self, page: Option<PageIndex>) -> bool {
        self.finalize_dispatched || page.is_some_and(|p| self.is_page_finalized(p))
    }

    pub fn is_page_finalized(&self, page: PageIndex) -> bool {
        self.finalized.contains(&page)
    }

    /// Every page in `1..=total` is persisted. Stray page files outside
    /// that range do not count.
    pub fn is_complete(&self) -> bool {
        self.total_pages().is_some_and(|total| {
            self.finalized.range(1..=total).count() == total as usize
        })
    }

    /// Record title, author and page count. Only the first call with a
    /// non-zero page count takes effect.
    ///
    /// When the page count arrives after every page was already saved by
    /// this process, the document is handed to the finalizer here and
    /// `DocumentCompleted` is returned. A document found fully cached on
    /// disk is only logged.
    pub fn set_metadata(&mut self, author: &str, title: &str, total_pages: u32) -> MetadataOutcome {
        if self.total_pages().is_some() {
            return MetadataOutcome::Unchanged;
        }

        tracing::info!(
            document_id = self.id,
            title,
            author,
            total_pages,
            "Document metadata"
        );
        self.metadata = Some(DocumentMetadata {
            title: title.to_string(),
            author: author.to_string(),
            total_pages,
        });

        if self.finalized.is_empty() || total_pages == 0 {
            return MetadataOutcome::Applied;
        }

        let missing = self.missing_pages();
        if missing.is_empty() {
            if self.saved_this_run > 0 && !self.finalize_dispatched {
                self.dispatch_finalize();
                return MetadataOutcome::DocumentCompleted;
            }
            tracing::info!(
                document_id = self.id,
                "All pages are already cached locally; remove this id from the wanted list"
            );
        } else {
            tracing::info!(
                document_id = self.id,
                missing = ?missing,
                "Pages still to fetch"
            );
        }
        MetadataOutcome::Applied
    }

    /// Keep the first bookmark tree and persist it next to the pages.
    /// Returns whether this call took effect.
    pub fn add_bookmark(&mut self, tree: Value) -> bool {
        if self.bookmark.is_some() {
            return false;
        }

        if let Err(e) = self.store.save_bookmark(&tree) {
            tracing::warn!(document_id = self.id, error = %e, "Failed to persist bookmark");
        }
        tracing::info!(document_id = self.id, "Bookmark tree stored");
        self.bookmark = Some(tree);
        true
    }

    /// Place a tile at `slot` of `page`.
    ///
    /// When the tile completes the page, the page is composed, persisted
    /// and marked finalized. When that makes every page finalized, the
    /// document is handed to the finalizer (once) and `DocumentCompleted`
    /// is returned.
    pub fn submit_tile(&mut self, page: PageIndex, slot: SlotIndex, bytes: Vec<u8>) -> SubmitOutcome {
        if self.filter(Some(page)) {
            return SubmitOutcome::Rejected;
        }

        let capacity = self.settings.tiles_per_page;
        let assembler = self
            .pages
            .entry(page)
            .or_insert_with(|| PageAssembler::new(capacity));

        if let Err(e) = assembler.add_tile(slot, bytes) {
            tracing::warn!(document_id = self.id, page, slot, error = %e, "Dropping tile");
            if assembler.filled() == 0 {
                self.pages.remove(&page);
            }
            return SubmitOutcome::Rejected;
        }

        if !assembler.is_complete() {
            let filled = assembler.filled();
            tracing::debug!(document_id = self.id, page, slot, filled, capacity, "Tile stored");
            return SubmitOutcome::Pending { filled, capacity };
        }

        let Some(assembler) = self.pages.remove(&page) else {
            return SubmitOutcome::Rejected;
        };

        match self.persist_page(page, assembler) {
            Ok(path) => {
                self.finalized.insert(page);
                self.saved_this_run += 1;
                tracing::info!(
                    document_id = self.id,
                    page,
                    finalized = self.finalized.len(),
                    total = ?self.total_pages(),
                    path = %path.display(),
                    "Page saved"
                );
            }
            Err(e) => {
                tracing::error!(document_id = self.id, page, error = %e, "Failed to save page");
                return SubmitOutcome::PageFailed { page };
            }
        }

        if self.is_complete() && !self.finalize_dispatched {
            self.dispatch_finalize();
            return SubmitOutcome::DocumentCompleted { page };
        }

        SubmitOutcome::PageCompleted {
            page,
            finalized: self.finalized.len(),
            total: self.total_pages(),
        }
    }

    fn dispatch_finalize(&mut self) {
        self.finalize_dispatched = true;
        tracing::info!(document_id = self.id, "All pages saved, finalizing document");
        self.finalizer.finalize(self.finalize_job());
    }

    fn persist_page(&self, page: PageIndex, assembler: PageAssembler) -> StoreResult<PathBuf> {
        let image = assembler.compose()?;
        let bytes = encode_page(&image, self.settings.image_format, self.settings.quality)?;
        self.store.save_page(page, &bytes)
    }

    /// Pages in `1..=total` not yet persisted; empty until metadata arrives
    pub fn missing_pages(&self) -> Vec<PageIndex> {
        match self.total_pages() {
            Some(total) => (1..=total).filter(|p| !self.finalized.contains(p)).collect(),
            None => Vec::new(),
        }
    }

    /// `<output_dir>/<id>_<title>(<author>).pdf`
    pub fn output_path(&self) -> PathBuf {
        let (title, author) = self
            .metadata
            .as_ref()
            .map(|m| (m.title.as_str(), m.author.as_str()))
            .unwrap_or_default();
        self.settings.output_dir.join(format!(
            "{}_{}({}).pdf",
            self.id,
            sanitize_file_name(title),
            sanitize_file_name(author)
        ))
    }

    fn finalize_job(&self) -> FinalizeJob {
        FinalizeJob {
            document_id: self.id,
            page_dir: self.store.dir().to_path_buf(),
            output_path: self.output_path(),
            bookmark: self.bookmark.clone(),
            image_extension: self.store.extension().to_string(),
            quality: self.settings.quality,
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            document_id: self.id,
            metadata: self.metadata.clone(),
            finalized_pages: self.finalized.len(),
            pages_in_progress: self.pages.len(),
            missing_pages: self.missing_pages(),
            has_bookmark: self.bookmark.is_some(),
            finalize_dispatched: self.finalize_dispatched,
            page_dir: self.store.dir().to_path_buf(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use parking_lot::Mutex;

    use crate::finalize::{DocumentFinalizer, FinalizeJob};

    /// Finalizer that only remembers the jobs it was given
    #[derive(Default)]
    pub struct RecordingFinalizer {
        pub jobs: Mutex<Vec<FinalizeJob>>,
    }

    impl DocumentFinalizer for RecordingFinalizer {
        fn finalize(&self, job: FinalizeJob) {
            self.jobs.lock().push(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::RecordingFinalizer;
    use super::*;
    use crate::assembly::fixtures::{slot_color, solid_tile};
    use crate::assembly::ImageFormat;
    use serde_json::json;
    use tempfile::TempDir;

    struct Harness {
        _root: TempDir,
        settings: Arc<TrackerSettings>,
        finalizer: Arc<RecordingFinalizer>,
    }

    impl Harness {
        fn new(tiles_per_page: usize) -> Self {
            let root = TempDir::new().unwrap();
            let settings = Arc::new(TrackerSettings {
                tiles_per_page,
                image_format: ImageFormat::Png,
                quality: 80,
                image_dir: root.path().join("images"),
                output_dir: root.path().join("out"),
            });
            Self {
                _root: root,
                settings,
                finalizer: Arc::new(RecordingFinalizer::default()),
            }
        }

        fn tracker(&self, id: DocumentId) -> DocumentTracker {
            DocumentTracker::open(id, self.settings.clone(), self.finalizer.clone()).unwrap()
        }

        fn jobs(&self) -> Vec<FinalizeJob> {
            self.finalizer.jobs.lock().clone()
        }
    }

    fn fill_page(tracker: &mut DocumentTracker, page: PageIndex, slots: usize) -> SubmitOutcome {
        let mut last = SubmitOutcome::Rejected;
        for slot in 0..slots {
            last = tracker.submit_tile(page, slot, solid_tile(2, 3, slot_color(slot)));
        }
        last
    }

    #[test]
    fn test_page_completion_persists_and_filters() {
        let h = Harness::new(3);
        let mut tracker = h.tracker(1);
        tracker.set_metadata("Ada", "Notes", 2);

        assert_eq!(
            tracker.submit_tile(2, 1, solid_tile(2, 3, [0, 0, 0])),
            SubmitOutcome::Pending { filled: 1, capacity: 3 }
        );
        assert!(!tracker.filter(Some(2)));

        let outcome = fill_page(&mut tracker, 2, 3);
        assert_eq!(
            outcome,
            SubmitOutcome::PageCompleted { page: 2, finalized: 1, total: Some(2) }
        );
        assert!(tracker.filter(Some(2)));
        assert!(!tracker.filter(Some(1)));
        assert!(!tracker.filter(None));
        assert!(h.settings.image_dir.join("1").join("2.png").is_file());
        assert_eq!(tracker.missing_pages(), vec![1]);

        // Late duplicate for a finalized page is rejected
        assert_eq!(
            tracker.submit_tile(2, 0, solid_tile(2, 3, [0, 0, 0])),
            SubmitOutcome::Rejected
        );
    }

    #[test]
    fn test_document_completion_dispatches_once() {
        let h = Harness::new(2);
        let mut tracker = h.tracker(9);
        tracker.set_metadata("A/B", "Title: Sub", 2);
        tracker.add_bookmark(json!([{"label": "Cover", "pnum": 1}]));

        fill_page(&mut tracker, 2, 2);
        assert_eq!(fill_page(&mut tracker, 1, 2), SubmitOutcome::DocumentCompleted { page: 1 });

        assert!(tracker.filter(None));
        assert!(tracker.filter(Some(3)));
        assert_eq!(tracker.submit_tile(3, 0, vec![]), SubmitOutcome::Rejected);

        let jobs = h.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].document_id, 9);
        assert_eq!(jobs[0].image_extension, "png");
        assert_eq!(jobs[0].bookmark, Some(json!([{"label": "Cover", "pnum": 1}])));
        assert_eq!(
            jobs[0].output_path,
            h.settings.output_dir.join("9_Title Sub(AB).pdf")
        );
    }

    #[test]
    fn test_no_completion_without_metadata() {
        let h = Harness::new(1);
        let mut tracker = h.tracker(3);

        let outcome = fill_page(&mut tracker, 1, 1);
        assert_eq!(
            outcome,
            SubmitOutcome::PageCompleted { page: 1, finalized: 1, total: None }
        );
        assert!(h.jobs().is_empty());
        assert!(tracker.missing_pages().is_empty());
    }

    #[test]
    fn test_out_of_range_slot_does_not_create_page() {
        let h = Harness::new(6);
        let mut tracker = h.tracker(1);
        assert_eq!(tracker.submit_tile(1, 6, vec![1]), SubmitOutcome::Rejected);
        assert_eq!(tracker.snapshot().pages_in_progress, 0);
    }

    #[test]
    fn test_undecodable_page_can_be_refilled() {
        let h = Harness::new(2);
        let mut tracker = h.tracker(1);

        tracker.submit_tile(1, 0, solid_tile(2, 2, [1, 1, 1]));
        assert_eq!(
            tracker.submit_tile(1, 1, b"garbage".to_vec()),
            SubmitOutcome::PageFailed { page: 1 }
        );
        assert!(!tracker.is_page_finalized(1));

        assert!(matches!(fill_page(&mut tracker, 1, 2), SubmitOutcome::PageCompleted { page: 1, .. }));
    }

    #[test]
    fn test_metadata_is_immutable() {
        let h = Harness::new(6);
        let mut tracker = h.tracker(1);

        // A zero page count does not lock the metadata in
        assert_eq!(tracker.set_metadata("a", "t", 0), MetadataOutcome::Applied);
        assert_eq!(tracker.set_metadata("Ada", "Notes", 10), MetadataOutcome::Applied);
        assert_eq!(tracker.set_metadata("Bob", "Other", 20), MetadataOutcome::Unchanged);
        assert_eq!(tracker.metadata().unwrap().total_pages, 10);
        assert_eq!(tracker.metadata().unwrap().author, "Ada");
    }

    #[test]
    fn test_resume_counts_persisted_pages() {
        let h = Harness::new(1);
        {
            let mut first_run = h.tracker(5);
            fill_page(&mut first_run, 1, 1);
            fill_page(&mut first_run, 3, 1);
        }

        let mut tracker = h.tracker(5);
        assert!(tracker.filter(Some(1)));
        assert!(tracker.filter(Some(3)));
        assert_eq!(tracker.set_metadata("Ada", "Notes", 3), MetadataOutcome::Applied);
        assert_eq!(tracker.missing_pages(), vec![2]);

        assert_eq!(fill_page(&mut tracker, 2, 1), SubmitOutcome::DocumentCompleted { page: 2 });
        assert_eq!(h.jobs().len(), 1);
    }

    #[test]
    fn test_metadata_after_last_page_finalizes() {
        let h = Harness::new(2);
        let mut tracker = h.tracker(4);

        fill_page(&mut tracker, 1, 2);
        assert_eq!(
            fill_page(&mut tracker, 2, 2),
            SubmitOutcome::PageCompleted { page: 2, finalized: 2, total: None }
        );
        assert!(h.jobs().is_empty());

        assert_eq!(
            tracker.set_metadata("Ada", "Notes", 2),
            MetadataOutcome::DocumentCompleted
        );
        assert!(tracker.filter(None));
        assert_eq!(h.jobs().len(), 1);
        assert_eq!(h.jobs()[0].output_path, h.settings.output_dir.join("4_Notes(Ada).pdf"));

        assert_eq!(tracker.set_metadata("Ada", "Notes", 2), MetadataOutcome::Unchanged);
        assert_eq!(h.jobs().len(), 1);
    }

    #[test]
    fn test_fully_cached_resume_is_not_finalized() {
        let h = Harness::new(1);
        {
            let mut first_run = h.tracker(6);
            fill_page(&mut first_run, 1, 1);
            fill_page(&mut first_run, 2, 1);
        }

        let mut tracker = h.tracker(6);
        assert_eq!(tracker.set_metadata("Ada", "Notes", 2), MetadataOutcome::Applied);
        assert!(tracker.is_complete());
        assert!(!tracker.filter(None));
        assert!(h.jobs().is_empty());
    }

    #[test]
    fn test_pages_beyond_total_do_not_count() {
        let h = Harness::new(1);
        {
            let mut first_run = h.tracker(8);
            fill_page(&mut first_run, 1, 1);
            fill_page(&mut first_run, 7, 1);
        }

        let mut tracker = h.tracker(8);
        tracker.set_metadata("Ada", "Notes", 2);
        assert!(!tracker.is_complete());
        assert_eq!(tracker.missing_pages(), vec![2]);

        assert_eq!(fill_page(&mut tracker, 2, 1), SubmitOutcome::DocumentCompleted { page: 2 });
        assert_eq!(h.jobs().len(), 1);
    }

    #[test]
    fn test_bookmark_is_kept_once_and_persisted() {
        let h = Harness::new(6);
        let mut tracker = h.tracker(2);

        assert!(tracker.add_bookmark(json!(["first"])));
        assert!(!tracker.add_bookmark(json!(["second"])));
        let stored = std::fs::read_to_string(h.settings.image_dir.join("2").join("bookmark.json")).unwrap();
        assert_eq!(stored, r#"["first"]"#);
        assert!(tracker.snapshot().has_bookmark);
    }
}
