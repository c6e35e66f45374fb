//! blockwatch-cosmos — CometBFT JSON-RPC backend for blockwatch.
//!
//! Provides [`CometFetcher`], a [`blockwatch_core::BlockFetcher`] that reads
//! blocks and transactions from a Cosmos SDK node's CometBFT RPC port
//! (usually `:26657`).
//!
//! ```rust,no_run
//! use blockwatch_core::WatcherBuilder;
//! use blockwatch_cosmos::CometFetcher;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = CometFetcher::connect("http://localhost:26657")?;
//! let watcher = WatcherBuilder::new()
//!     .rpc_url("http://localhost:26657")
//!     .follow_head()
//!     .build(fetcher);
//! let summary = watcher.run(Default::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod fetcher;
pub mod request;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use error::TransportError;
pub use fetcher::{block_from_json, tx_response_from_json, CometFetcher};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
