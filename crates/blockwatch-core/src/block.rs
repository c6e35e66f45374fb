//! Raw and decoded block types.

use chrono::{DateTime, Utc};

use crate::error::WatcherError;
use crate::tx::{decode_tx, Tx, TxHash};

// ─── RawBlock ────────────────────────────────────────────────────────────────

/// A block as returned by a [`BlockFetcher`](crate::fetcher::BlockFetcher):
/// header fields plus undecoded transaction bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub chain_id: String,
    pub height: i64,
    pub time: DateTime<Utc>,
    pub txs: Vec<Vec<u8>>,
}

// ─── Block ───────────────────────────────────────────────────────────────────

/// A fully decoded block, delivered to handlers.
///
/// `tx_hashes[i]` is the content hash of `txs[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub chain_id: String,
    pub height: i64,
    pub time: DateTime<Utc>,
    pub tx_hashes: Vec<TxHash>,
    pub txs: Vec<Tx>,
}

impl Block {
    /// Decode every transaction of `raw`.
    ///
    /// Fails as a whole on the first undecodable transaction: a block is
    /// never built with only part of its transactions.
    pub fn decode(raw: RawBlock) -> Result<Self, WatcherError> {
        let mut tx_hashes = Vec::with_capacity(raw.txs.len());
        let mut txs = Vec::with_capacity(raw.txs.len());
        for (index, bytes) in raw.txs.iter().enumerate() {
            let tx = decode_tx(bytes).map_err(|source| WatcherError::Decode {
                height: raw.height,
                index,
                source,
            })?;
            tx_hashes.push(TxHash::of(bytes));
            txs.push(tx);
        }
        Ok(Self {
            chain_id: raw.chain_id,
            height: raw.height,
            time: raw.time,
            tx_hashes,
            txs,
        })
    }

    pub fn tx_count(&self) -> usize {
        self.txs.len()
    }

    /// Iterate `(hash, tx)` pairs in block order.
    pub fn iter_txs(&self) -> impl Iterator<Item = (&TxHash, &Tx)> {
        self.tx_hashes.iter().zip(self.txs.iter())
    }
}

// ─── TxResponse ──────────────────────────────────────────────────────────────

/// Result of a point lookup by transaction hash.
#[derive(Debug, Clone, PartialEq)]
pub struct TxResponse {
    pub hash: TxHash,
    pub height: i64,
    /// ABCI result code; `0` means success.
    pub code: u32,
    pub log: String,
    pub gas_wanted: i64,
    pub gas_used: i64,
    /// Decoded transaction, when the node returned its bytes.
    pub tx: Option<Tx>,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
