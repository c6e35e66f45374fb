//! blockwatch-core — the block watcher engine.
//!
//! # Architecture
//!
//! ```text
//! WatcherBuilder → Watcher (poll loop)
//!                     ├── resolve_window  (start/end heights vs. chain head)
//!                     ├── BlockFetcher    (latest head, exact height, tx by hash)
//!                     ├── tx::decode_tx   (TxRaw → TxBody + AuthInfo + signatures)
//!                     ├── DispatchPool    (at most K in-flight block dispatches)
//!                     └── HandlerSet      (ordered, independently enabled handlers)
//! ```

pub mod block;
pub mod builder;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod handler;
pub mod pool;
pub mod tx;
pub mod watcher;
pub mod window;

pub use block::{Block, RawBlock, TxResponse};
pub use builder::WatcherBuilder;
pub use config::{EndHeight, StartHeight, WatcherConfig};
pub use error::WatcherError;
pub use fetcher::BlockFetcher;
pub use handler::{BlockHandler, DispatchContext, HandlerSet, ScanPhase};
pub use pool::DispatchPool;
pub use tx::{decode_tx, DecodeError, Tx, TxHash};
pub use watcher::{ScanSummary, Watcher, WatcherHandle, WatcherState};
pub use window::{resolve_window, EndBound, Resolution, ScanWindow};
