//! The `BlockFetcher` trait: the watcher's view of a remote node.

use async_trait::async_trait;

use crate::block::{RawBlock, TxResponse};
use crate::error::WatcherError;
use crate::tx::TxHash;

/// Source of blocks and transactions.
///
/// Shared behind an `Arc` by the poll loop, so implementations must be safe
/// for concurrent use. Failures are reported as [`WatcherError::Rpc`]; the
/// watcher logs them and retries on a later iteration.
#[async_trait]
pub trait BlockFetcher: Send + Sync + 'static {
    /// The current chain head.
    async fn latest_block(&self) -> Result<RawBlock, WatcherError>;

    /// The block at exactly `height`.
    async fn block_at(&self, height: i64) -> Result<RawBlock, WatcherError>;

    /// Point lookup of a committed transaction.
    async fn tx_by_hash(&self, hash: &TxHash) -> Result<TxResponse, WatcherError>;
}

#[async_trait]
impl<F: BlockFetcher + ?Sized> BlockFetcher for std::sync::Arc<F> {
    async fn latest_block(&self) -> Result<RawBlock, WatcherError> {
        (**self).latest_block().await
    }

    async fn block_at(&self, height: i64) -> Result<RawBlock, WatcherError> {
        (**self).block_at(height).await
    }

    async fn tx_by_hash(&self, hash: &TxHash) -> Result<TxResponse, WatcherError> {
        (**self).tx_by_hash(hash).await
    }
}
