//! Exchange handlers
//!
//! One entry point per exchange kind. Each handler extracts identifiers
//! from the URL, consults [`DocumentPool::filter`] before decoding any
//! token or body, and reports what it did as an [`ExchangeOutcome`].
//! Nothing here returns an error to the caller.

use super::pool::DocumentPool;
use super::types::{ExchangeOutcome, MetadataOutcome, RoutedExchange, SubmitOutcome};
use crate::exchange::{
    parse_bookmark, parse_metadata, parse_pre_tile, DocumentParams, ExchangeError, ExchangeKind,
    PageParams,
};
use crate::order::ResolvedOrder;
use crate::types::SlotIndex;

fn malformed(kind: ExchangeKind, url: &str, error: ExchangeError) -> ExchangeOutcome {
    tracing::warn!(kind = kind.as_str(), url, error = %error, "Malformed exchange");
    ExchangeOutcome::Malformed
}

impl DocumentPool {
    /// Classify `url` and dispatch to the matching handler
    pub fn route(&self, url: &str, body: &[u8]) -> RoutedExchange {
        let Some(kind) = self.patterns().classify(url) else {
            return RoutedExchange {
                kind: None,
                outcome: ExchangeOutcome::Ignored,
            };
        };

        let outcome = match kind {
            ExchangeKind::Tile => self.on_tile_exchange(url, body),
            ExchangeKind::PreTile => self.on_pre_tile_exchange(url, body),
            ExchangeKind::Metadata => self.on_metadata_exchange(url, body),
            ExchangeKind::Bookmark => self.on_bookmark_exchange(url, body),
        };
        tracing::debug!(kind = kind.as_str(), outcome = ?outcome, "Exchange handled");

        RoutedExchange {
            kind: Some(kind),
            outcome,
        }
    }

    /// `?bid=` with `{"data": {"author", "name", "pages"}}`
    pub fn on_metadata_exchange(&self, url: &str, body: &[u8]) -> ExchangeOutcome {
        let params = match DocumentParams::from_query(url) {
            Ok(params) => params,
            Err(e) => return malformed(ExchangeKind::Metadata, url, e),
        };
        if self.filter(params.document_id, None) {
            return ExchangeOutcome::Filtered;
        }

        let metadata = match parse_metadata(body) {
            Ok(metadata) => metadata,
            Err(e) => return malformed(ExchangeKind::Metadata, url, e),
        };
        let Some(tracker) = self.tracker(params.document_id) else {
            return ExchangeOutcome::Filtered;
        };

        let outcome = tracker
            .lock()
            .set_metadata(&metadata.author, &metadata.name, metadata.pages);
        if outcome == MetadataOutcome::DocumentCompleted {
            self.evict(params.document_id);
        }
        ExchangeOutcome::from(outcome)
    }

    /// `?bid=&pnum=&k=<token>` with `{"data": "<base64 ciphertext>"}`
    pub fn on_pre_tile_exchange(&self, url: &str, body: &[u8]) -> ExchangeOutcome {
        let params = match PageParams::from_query(url) {
            Ok(params) => params,
            Err(e) => return malformed(ExchangeKind::PreTile, url, e),
        };
        if self.filter(params.document_id, Some(params.page_index)) {
            return ExchangeOutcome::Filtered;
        }

        let ciphertext = match parse_pre_tile(body) {
            Ok(ciphertext) => ciphertext,
            Err(e) => return malformed(ExchangeKind::PreTile, url, e),
        };
        if ciphertext.is_empty() {
            tracing::debug!(
                document_id = params.document_id,
                page = params.page_index,
                "Empty pre-tile payload"
            );
            return ExchangeOutcome::Empty;
        }

        self.record_order(&params.token, &ciphertext)
    }

    /// Record a decoded announcement, then drop it again if its document
    /// was evicted since the filter ran.
    pub(crate) fn record_order(&self, token: &str, ciphertext: &str) -> ExchangeOutcome {
        let pending = match self.orders().record_pre_tile(token, ciphertext) {
            Ok(pending) => pending,
            Err(_) => return ExchangeOutcome::Miss,
        };

        if self.is_finished(pending.document_id) {
            let dropped = self.orders().forget_document(pending.document_id);
            tracing::debug!(document_id = pending.document_id, dropped, "Order for evicted document");
            return ExchangeOutcome::Filtered;
        }
        ExchangeOutcome::Recorded
    }

    /// `.../<bid>/<pnum>?k=<token>` with the tile image as body.
    ///
    /// The token's document and page select the pending order; the URL's
    /// decide where the tile is placed.
    pub fn on_tile_exchange(&self, url: &str, body: &[u8]) -> ExchangeOutcome {
        let params = match PageParams::from_path(url) {
            Ok(params) => params,
            Err(e) => return malformed(ExchangeKind::Tile, url, e),
        };
        if self.filter(params.document_id, Some(params.page_index)) {
            return ExchangeOutcome::Filtered;
        }

        let local_seq = match self.orders().resolve_tile(&params.token) {
            Ok(ResolvedOrder::Found { local_seq, .. }) => local_seq,
            Ok(ResolvedOrder::NotFound { .. }) => return ExchangeOutcome::Unresolved,
            Err(_) => return ExchangeOutcome::Miss,
        };
        let Some(tracker) = self.tracker(params.document_id) else {
            return ExchangeOutcome::Filtered;
        };

        let slot = SlotIndex::try_from(local_seq).unwrap_or(SlotIndex::MAX);
        let outcome = tracker
            .lock()
            .submit_tile(params.page_index, slot, body.to_vec());

        if let SubmitOutcome::DocumentCompleted { .. } = outcome {
            self.evict(params.document_id);
        }
        ExchangeOutcome::from(&outcome)
    }

    /// `?bid=` with `{"data": [tree]}`
    pub fn on_bookmark_exchange(&self, url: &str, body: &[u8]) -> ExchangeOutcome {
        let params = match DocumentParams::from_query(url) {
            Ok(params) => params,
            Err(e) => return malformed(ExchangeKind::Bookmark, url, e),
        };
        if self.filter(params.document_id, None) {
            return ExchangeOutcome::Filtered;
        }

        let tree = match parse_bookmark(body) {
            Ok(tree) => tree,
            Err(e) => return malformed(ExchangeKind::Bookmark, url, e),
        };
        let Some(tracker) = self.tracker(params.document_id) else {
            return ExchangeOutcome::Filtered;
        };

        if tracker.lock().add_bookmark(tree) {
            ExchangeOutcome::Applied
        } else {
            ExchangeOutcome::Unchanged
        }
    }
}
