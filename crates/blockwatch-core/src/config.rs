//! Watcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::WatcherError;

/// Configuration for a watcher instance.
///
/// Heights use the conventional signed encoding on the wire (see
/// [`StartHeight`] and [`EndHeight`] for the decoded meaning).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// A disabled watcher starts and stops immediately.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Node RPC endpoint, e.g. `"http://localhost:26657"`.
    #[serde(default)]
    pub rpc_url: String,
    /// Wait between head polls while tailing (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// First height to deliver. `<= -1` follows the head observed at startup.
    #[serde(default = "default_height")]
    pub start_height: i64,
    /// Exclusive end height. `0` stops at the head observed at startup,
    /// `< 0` runs forever.
    #[serde(default = "default_height")]
    pub end_height: i64,
    /// Maximum number of blocks being dispatched to handlers concurrently.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn bool_true() -> bool { true }
fn default_poll_interval_ms() -> u64 { 5_000 }
fn default_height() -> i64 { -1 }
fn default_pool_size() -> usize { 100 }

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_url: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            start_height: default_height(),
            end_height: default_height(),
            pool_size: default_pool_size(),
        }
    }
}

impl WatcherConfig {
    /// Section name used in configuration files.
    pub const NAME: &'static str = "watcher";

    /// Validate the configuration. Disabled configs are always valid.
    pub fn check(&self) -> Result<(), WatcherError> {
        if !self.enabled {
            return Ok(());
        }
        if self.rpc_url.is_empty() {
            return Err(WatcherError::Config("rpc_url is empty".into()));
        }
        if self.pool_size == 0 {
            return Err(WatcherError::Config("pool_size must be positive".into()));
        }
        if self.pool_size > Semaphore::MAX_PERMITS {
            return Err(WatcherError::Config(format!(
                "pool_size {} exceeds the maximum of {}",
                self.pool_size,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start(&self) -> StartHeight {
        StartHeight::from_raw(self.start_height)
    }

    pub fn end(&self) -> EndHeight {
        EndHeight::from_raw(self.end_height)
    }
}

// ─── Height bounds ───────────────────────────────────────────────────────────

/// Where a scan begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartHeight {
    /// The chain head observed at startup; no backlog is processed.
    Head,
    At(i64),
}

impl StartHeight {
    pub fn from_raw(raw: i64) -> Self {
        if raw <= -1 {
            Self::Head
        } else {
            Self::At(raw)
        }
    }
}

/// Where a scan ends (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndHeight {
    /// Keep tailing the chain forever.
    Unbounded,
    /// The chain head observed at startup: a one-shot catch-up run.
    Head,
    At(i64),
}

impl EndHeight {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Self::Head,
            r if r < 0 => Self::Unbounded,
            r => Self::At(r),
        }
    }
}
