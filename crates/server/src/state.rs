//! Application state shared across handlers.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::db::RecordStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the record store, the clock and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Record store adapter (`PostgreSQL` in production)
    /// * `clock` - Time source
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                clock,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Local offset for day boundaries and weekday buckets.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.inner.config.utc_offset
    }
}
