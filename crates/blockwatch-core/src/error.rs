//! Error types for the block watcher.

use thiserror::Error;

use crate::tx::DecodeError;

/// Errors that can occur while watching a chain.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Invalid configuration or scan window. Fatal, surfaced before the loop starts.
    #[error("Config error: {0}")]
    Config(String),

    /// Head, block or transaction fetch failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A transaction in the block could not be decoded.
    #[error("Decode error at height {height}, tx #{index}: {source}")]
    Decode {
        height: i64,
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Handler error in '{handler}': {reason}")]
    Handler { handler: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl WatcherError {
    /// Shorthand for a handler failure.
    pub fn handler(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}
