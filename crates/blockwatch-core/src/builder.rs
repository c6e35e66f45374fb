//! Fluent builder API for creating watchers.
//!
//! # Example
//!
//! ```rust,no_run
//! use blockwatch_core::WatcherBuilder;
//!
//! let config = WatcherBuilder::new()
//!     .rpc_url("http://localhost:26657")
//!     .start_height(19_000_000)
//!     .pool_size(32)
//!     .poll_interval_ms(2_000)
//!     .build_config();
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::WatcherConfig;
use crate::fetcher::BlockFetcher;
use crate::handler::{BlockHandler, HandlerSet};
use crate::watcher::Watcher;

/// Fluent builder for [`WatcherConfig`] and [`Watcher`].
#[derive(Default)]
pub struct WatcherBuilder {
    config: WatcherConfig,
    handlers: HandlerSet,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: WatcherConfig) -> Self {
        Self {
            config,
            handlers: HandlerSet::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the node RPC endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    /// Set the first height to deliver.
    pub fn start_height(mut self, height: i64) -> Self {
        self.config.start_height = height;
        self
    }

    /// Start from the chain head observed at startup.
    pub fn follow_head(mut self) -> Self {
        self.config.start_height = -1;
        self
    }

    /// Set the exclusive end height.
    pub fn end_height(mut self, height: i64) -> Self {
        self.config.end_height = height;
        self
    }

    /// Stop once the backlog present at startup is processed.
    pub fn end_at_head(mut self) -> Self {
        self.config.end_height = 0;
        self
    }

    /// Set the maximum number of concurrently dispatched blocks.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the tailing poll interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Register a handler. Handlers run in registration order.
    pub fn handler(mut self, handler: Arc<dyn BlockHandler>) -> Self {
        self.handlers.register(handler);
        self
    }

    /// Set the pause taken after a handler failure.
    pub fn handler_error_pause(mut self, pause: Duration) -> Self {
        self.handlers.set_error_pause(pause);
        self
    }

    /// Build the [`WatcherConfig`].
    pub fn build_config(self) -> WatcherConfig {
        self.config
    }

    /// Build a [`Watcher`] over `fetcher`.
    pub fn build<F: BlockFetcher>(self, fetcher: F) -> Watcher<F> {
        Watcher::with_handlers(self.config, fetcher, self.handlers)
    }
}
