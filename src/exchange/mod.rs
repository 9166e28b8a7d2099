//! Upstream exchange schema
//!
//! Classifies intercepted response URLs and pulls identifiers and payloads
//! out of them. Everything here is site-specific; the pool only sees the
//! typed results.

mod body;
mod error;
mod kind;
mod params;

pub use body::{parse_bookmark, parse_metadata, parse_pre_tile, MetadataBody};
pub use error::{ExchangeError, ExchangeResult};
pub use kind::{ExchangeKind, UrlPatterns};
pub use params::{query_param, DocumentParams, PageParams};
