//! Transport-level error types.

use blockwatch_core::WatcherError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a CometBFT node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("{0}")]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Response parsed but carried unusable values.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for WatcherError {
    fn from(e: TransportError) -> Self {
        WatcherError::Rpc(e.to_string())
    }
}
