//! Folio
//!
//! Rebuilds paginated documents from intercepted reader traffic. Page
//! images arrive as shuffled tiles whose order is only recoverable by
//! pairing each tile with an earlier encrypted announcement; this crate
//! resolves that order, stitches pages, persists them, and writes the
//! finished document.

pub mod assembly;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod exchange;
pub mod finalize;
pub mod order;
pub mod routes;
pub mod state;
pub mod types;

pub use config::Config;
pub use document::{DocumentPool, ExchangeOutcome, RoutedExchange};
pub use state::AppState;
