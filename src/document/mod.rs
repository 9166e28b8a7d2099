//! Document tracking
//!
//! [`DocumentPool`] owns one [`DocumentTracker`] per wanted document and
//! routes intercepted exchanges to them:
//!
//! ```text
//! exchange ─▶ pool.filter ─▶ codec / order table ─▶ tracker.submit_tile
//!                                                     │
//!                          page complete ─▶ compose ─▶ page store
//!                          document complete ─▶ finalizer ─▶ pool.evict
//! ```

mod error;
mod handlers;
mod pool;
mod store;
mod tracker;
mod types;

pub use error::{StoreError, StoreResult};
pub use pool::DocumentPool;
pub use store::{list_page_images, load_bookmark, PageStore, BOOKMARK_FILE};
pub use tracker::DocumentTracker;
pub use types::{
    DocumentMetadata, DocumentSnapshot, ExchangeOutcome, MetadataOutcome, PoolSnapshot,
    RoutedExchange, SubmitOutcome, TrackerSettings,
};
