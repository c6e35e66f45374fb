//! Shared fixtures: a scripted in-memory chain and recording handlers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blockwatch_core::tx::proto::{AuthInfo, TxBody, TxRaw};
use blockwatch_core::{
    Block, BlockFetcher, BlockHandler, DispatchContext, RawBlock, Tx, TxHash, TxResponse,
    WatcherError,
};
use chrono::DateTime;
use prost::Message;
use tokio::sync::mpsc;

pub const CHAIN_ID: &str = "test-chain-1";

pub fn valid_tx(memo: &str) -> Vec<u8> {
    Tx {
        body: TxBody {
            memo: memo.into(),
            ..Default::default()
        },
        auth_info: AuthInfo::default(),
        signatures: vec![vec![7u8; 64]],
    }
    .to_bytes()
}

pub fn corrupt_auth_info_tx() -> Vec<u8> {
    TxRaw {
        body_bytes: TxBody::default().encode_to_vec(),
        auth_info_bytes: vec![0xff, 0xff],
        signatures: vec![],
    }
    .encode_to_vec()
}

pub fn raw_block(height: i64, corrupt: bool) -> RawBlock {
    let second = if corrupt {
        corrupt_auth_info_tx()
    } else {
        valid_tx(&format!("tx-b-{height}"))
    };
    RawBlock {
        chain_id: CHAIN_ID.into(),
        height,
        time: DateTime::from_timestamp(1_700_000_000 + height * 6, 0).unwrap(),
        txs: vec![valid_tx(&format!("tx-a-{height}")), second],
    }
}

// ─── MockChain ───────────────────────────────────────────────────────────────

/// In-memory chain. `latest_block` pops scripted heads (the last one
/// sticks); `block_at` serves any height up to the current head.
pub struct MockChain {
    head: Mutex<i64>,
    script: Mutex<VecDeque<i64>>,
    failing_heights: Mutex<HashSet<i64>>,
    /// height -> remaining corrupt serves (`u32::MAX` = forever)
    corrupt_heights: Mutex<HashMap<i64, u32>>,
    misreported_heights: Mutex<HashSet<i64>>,
    latest_failures: AtomicU32,
    pub block_at_calls: Mutex<Vec<i64>>,
    pub latest_calls: AtomicU32,
}

impl MockChain {
    pub fn at_head(head: i64) -> Arc<Self> {
        Self::scripted(&[head])
    }

    pub fn scripted(heads: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            head: Mutex::new(heads[0]),
            script: Mutex::new(heads.iter().copied().collect()),
            failing_heights: Mutex::new(HashSet::new()),
            corrupt_heights: Mutex::new(HashMap::new()),
            misreported_heights: Mutex::new(HashSet::new()),
            latest_failures: AtomicU32::new(0),
            block_at_calls: Mutex::new(vec![]),
            latest_calls: AtomicU32::new(0),
        })
    }

    pub fn fail_height(&self, height: i64) {
        self.failing_heights.lock().unwrap().insert(height);
    }

    pub fn corrupt_height(&self, height: i64) {
        self.corrupt_for(height, u32::MAX);
    }

    /// Serve a corrupt block at `height` for the next `serves` fetches only.
    pub fn corrupt_for(&self, height: i64, serves: u32) {
        self.corrupt_heights.lock().unwrap().insert(height, serves);
    }

    /// `block_at(height)` answers with the block one above.
    pub fn misreport_height(&self, height: i64) {
        self.misreported_heights.lock().unwrap().insert(height);
    }

    pub fn fail_next_latest(&self, n: u32) {
        self.latest_failures.store(n, Ordering::SeqCst);
    }

    pub fn block_at_calls(&self) -> Vec<i64> {
        self.block_at_calls.lock().unwrap().clone()
    }

    fn is_corrupt(&self, height: i64) -> bool {
        match self.corrupt_heights.lock().unwrap().get_mut(&height) {
            Some(0) | None => false,
            Some(n) => {
                if *n != u32::MAX {
                    *n -= 1;
                }
                true
            }
        }
    }
}

#[async_trait]
impl BlockFetcher for MockChain {
    async fn latest_block(&self) -> Result<RawBlock, WatcherError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .latest_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(WatcherError::Rpc("connection refused".into()));
        }
        let height = {
            let mut script = self.script.lock().unwrap();
            let mut head = self.head.lock().unwrap();
            if let Some(h) = script.front() {
                *head = *h;
            }
            if script.len() > 1 {
                script.pop_front();
            }
            *head
        };
        Ok(raw_block(height, self.is_corrupt(height)))
    }

    async fn block_at(&self, height: i64) -> Result<RawBlock, WatcherError> {
        self.block_at_calls.lock().unwrap().push(height);
        if self.failing_heights.lock().unwrap().contains(&height) {
            return Err(WatcherError::Rpc(format!("block {height} unavailable")));
        }
        if height > *self.head.lock().unwrap() {
            return Err(WatcherError::Rpc(format!("height {height} is not available yet")));
        }
        if self.misreported_heights.lock().unwrap().contains(&height) {
            return Ok(raw_block(height + 1, false));
        }
        Ok(raw_block(height, self.is_corrupt(height)))
    }

    async fn tx_by_hash(&self, hash: &TxHash) -> Result<TxResponse, WatcherError> {
        Err(WatcherError::Rpc(format!("tx {hash} not found")))
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// Records every delivered block, optionally taking `work` per block.
pub struct Collector {
    pub heights: Mutex<Vec<i64>>,
    pub tx_counts: Mutex<Vec<usize>>,
    work: Duration,
    active: AtomicUsize,
    pub peak: AtomicUsize,
    pub completed: AtomicUsize,
    notify: Option<mpsc::UnboundedSender<i64>>,
}

impl Collector {
    pub fn new() -> Arc<Self> {
        Self::build(Duration::ZERO, None)
    }

    pub fn slow(work: Duration) -> Arc<Self> {
        Self::build(work, None)
    }

    pub fn notifying() -> (Arc<Self>, mpsc::UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::build(Duration::ZERO, Some(tx)), rx)
    }

    fn build(work: Duration, notify: Option<mpsc::UnboundedSender<i64>>) -> Arc<Self> {
        Arc::new(Self {
            heights: Mutex::new(vec![]),
            tx_counts: Mutex::new(vec![]),
            work,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            notify,
        })
    }

    pub fn sorted_heights(&self) -> Vec<i64> {
        let mut h = self.heights.lock().unwrap().clone();
        h.sort_unstable();
        h
    }
}

#[async_trait]
impl BlockHandler for Collector {
    fn name(&self) -> &str {
        "collector"
    }

    async fn handle_block(&self, block: &Block, _ctx: &DispatchContext) -> Result<(), WatcherError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.heights.lock().unwrap().push(block.height);
        self.tx_counts.lock().unwrap().push(block.tx_count());
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = &self.notify {
            let _ = tx.send(block.height);
        }
        Ok(())
    }
}

/// Fails every block, counting invocations.
pub struct AlwaysFails {
    pub calls: AtomicU32,
}

impl AlwaysFails {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl BlockHandler for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    async fn handle_block(&self, block: &Block, _ctx: &DispatchContext) -> Result<(), WatcherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WatcherError::handler("always-fails", format!("rejecting block {}", block.height)))
    }
}
