//! Configuration file loading.
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [watcher]
//! rpc_url = "http://localhost:26657"
//! start_height = -1
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use blockwatch_core::WatcherConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in '{}'", path.display()))
    }

    /// Validate every section.
    pub fn check(&self) -> Result<()> {
        self.watcher
            .check()
            .with_context(|| format!("[{}] section", WatcherConfig::NAME))
    }
}
