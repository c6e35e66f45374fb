//! `BlockFetcher` implementation over the CometBFT JSON-RPC API.
//!
//! Uses two methods:
//! - `block` (optionally with `height`) for header fields and raw txs
//! - `tx` for point lookups by hash

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use blockwatch_core::{decode_tx, BlockFetcher, RawBlock, TxHash, TxResponse, WatcherError};

use crate::client::HttpRpcClient;
use crate::error::TransportError;

// ─── Response shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BlockResult {
    block: BlockJson,
}

#[derive(Debug, Deserialize)]
struct BlockJson {
    header: HeaderJson,
    data: DataJson,
}

#[derive(Debug, Deserialize)]
struct HeaderJson {
    chain_id: String,
    height: String,
    time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DataJson {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    hash: String,
    height: String,
    #[serde(default)]
    index: usize,
    tx_result: TxResultJson,
    #[serde(default)]
    tx: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxResultJson {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    gas_wanted: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
}

fn parse_i64(field: &str, value: &str) -> Result<i64, TransportError> {
    value
        .parse()
        .map_err(|_| TransportError::InvalidResponse(format!("{field}: not an integer: {value:?}")))
}

/// Convert the `result` of a `block` call into a [`RawBlock`].
pub fn block_from_json(result: Value) -> Result<RawBlock, TransportError> {
    let parsed: BlockResult = serde_json::from_value(result)?;
    let header = parsed.block.header;
    let height = parse_i64("block.header.height", &header.height)?;

    let txs = parsed
        .block
        .data
        .txs
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, encoded)| {
            BASE64.decode(encoded).map_err(|e| {
                TransportError::InvalidResponse(format!("block {height} tx #{i}: bad base64: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawBlock {
        chain_id: header.chain_id,
        height,
        time: header.time,
        txs,
    })
}

/// Convert the `result` of a `tx` call into a [`TxResponse`].
///
/// A transaction that is present but undecodable is reported as a decode
/// error at its block position.
pub fn tx_response_from_json(result: Value) -> Result<TxResponse, WatcherError> {
    let parsed: TxResult = serde_json::from_value(result).map_err(TransportError::from)?;
    let hash: TxHash = parsed
        .hash
        .parse()
        .map_err(|e| TransportError::InvalidResponse(format!("hash: {e}")))?;
    let height = parse_i64("height", &parsed.height)?;
    let r = parsed.tx_result;
    let gas_wanted = match r.gas_wanted.as_deref() {
        Some(v) => parse_i64("tx_result.gas_wanted", v)?,
        None => 0,
    };
    let gas_used = match r.gas_used.as_deref() {
        Some(v) => parse_i64("tx_result.gas_used", v)?,
        None => 0,
    };

    let tx = match parsed.tx {
        Some(encoded) => {
            let bytes = BASE64
                .decode(&encoded)
                .map_err(|e| TransportError::InvalidResponse(format!("tx: bad base64: {e}")))?;
            let tx = decode_tx(&bytes).map_err(|source| WatcherError::Decode {
                height,
                index: parsed.index,
                source,
            })?;
            Some(tx)
        }
        None => None,
    };

    Ok(TxResponse {
        hash,
        height,
        code: r.code,
        log: r.log,
        gas_wanted,
        gas_used,
        tx,
    })
}

// ─── CometFetcher ────────────────────────────────────────────────────────────

/// Fetches blocks from a CometBFT node's JSON-RPC endpoint.
pub struct CometFetcher {
    client: HttpRpcClient,
}

impl CometFetcher {
    pub fn new(client: HttpRpcClient) -> Self {
        Self { client }
    }

    /// Connect to `url` with default client settings.
    pub fn connect(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self::new(HttpRpcClient::default_for(url)?))
    }

    pub fn url(&self) -> &str {
        self.client.url()
    }

    async fn block(&self, params: Value) -> Result<RawBlock, WatcherError> {
        let result = self.client.call("block", params).await?;
        Ok(block_from_json(result)?)
    }
}

#[async_trait]
impl BlockFetcher for CometFetcher {
    async fn latest_block(&self) -> Result<RawBlock, WatcherError> {
        self.block(json!({})).await
    }

    async fn block_at(&self, height: i64) -> Result<RawBlock, WatcherError> {
        // CometBFT expects int64 params as strings
        self.block(json!({ "height": height.to_string() })).await
    }

    async fn tx_by_hash(&self, hash: &TxHash) -> Result<TxResponse, WatcherError> {
        let params = json!({
            "hash": BASE64.encode(hash.as_bytes()),
            "prove": false,
        });
        let result = self.client.call("tx", params).await?;
        tx_response_from_json(result)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
