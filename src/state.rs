//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::document::DocumentPool;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: DocumentPool,
}

impl AppState {
    pub fn new(config: Config, pool: DocumentPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the document pool
    pub fn pool(&self) -> &DocumentPool {
        &self.inner.pool
    }
}
