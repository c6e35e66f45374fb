//! The poll loop: resolves the scan window, then catches up and tails the
//! chain, handing every decoded block to the handler set.
//!
//! # States
//! `Idle → Resolving → {CatchingUp, Tailing} → Draining → Stopped`
//!
//! # Per iteration
//! - **Tailing** (`next` is above the last known head): sleep the poll
//!   interval, re-query the head, repeat until the head reaches `next`.
//!   A head exactly at `next` becomes this iteration's block; if it does not
//!   decode, the cursor stays and the head is polled again.
//! - **CatchingUp** (`next` at or below the last known head): fetch the
//!   block at exactly `next`.
//! - Decode, wait for a dispatch slot, spawn the handler fan-out.
//! - Advance `next` by one. During catch-up this happens whether or not
//!   fetch and decode succeeded.
//!
//! On cancellation or when the end bound is reached the loop drains every
//! in-flight dispatch before returning.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::block::{Block, RawBlock};
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::fetcher::BlockFetcher;
use crate::handler::{BlockHandler, DispatchContext, HandlerSet, ScanPhase};
use crate::pool::DispatchPool;
use crate::window::{resolve_window, Resolution, ScanWindow};

/// Heights between two progress log lines.
const PROGRESS_LOG_EVERY: i64 = 10;
/// Heights between two throughput log lines.
const RATE_LOG_EVERY: i64 = 10_000;

// ─── State ───────────────────────────────────────────────────────────────────

/// Runtime state of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Not yet started.
    Idle,
    /// Reading the chain head to resolve the scan window.
    Resolving,
    /// Fetching blocks at or below the last known head.
    CatchingUp,
    /// Waiting for the chain to produce the next block.
    Tailing,
    /// Waiting for in-flight dispatches to finish.
    Draining,
    /// Terminated.
    Stopped,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::CatchingUp => write!(f, "catching-up"),
            Self::Tailing => write!(f, "tailing"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// `None` if the watcher was disabled or cancelled before resolving.
    pub window: Option<ScanWindow>,
    /// Blocks handed to the handler set.
    pub dispatched: u64,
    /// Heights whose fetch or decode failed; nothing was dispatched for them.
    pub failed: u64,
    /// Handler calls that returned an error or panicked, across all blocks.
    pub handler_failures: u64,
    /// The height the loop would have processed next.
    pub next_height: i64,
}

// ─── Watcher ─────────────────────────────────────────────────────────────────

/// Watches a chain through a [`BlockFetcher`] and delivers decoded blocks
/// to registered [`BlockHandler`]s.
pub struct Watcher<F> {
    config: WatcherConfig,
    fetcher: F,
    handlers: HandlerSet,
    state: watch::Sender<WatcherState>,
}

impl<F: BlockFetcher> Watcher<F> {
    pub fn new(config: WatcherConfig, fetcher: F) -> Self {
        Self::with_handlers(config, fetcher, HandlerSet::new())
    }

    pub fn with_handlers(config: WatcherConfig, fetcher: F, handlers: HandlerSet) -> Self {
        let (state, _) = watch::channel(WatcherState::Idle);
        Self {
            config,
            fetcher,
            handlers,
            state,
        }
    }

    /// Append a handler. Handlers run in registration order.
    pub fn register_handler(&mut self, handler: Arc<dyn BlockHandler>) {
        self.handlers.register(handler);
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Run on a background task. Call [`WatcherHandle::close`] to stop.
    pub fn spawn(self) -> WatcherHandle {
        let cancel = CancellationToken::new();
        let state = self.subscribe_state();
        let join = tokio::spawn(self.run(cancel.clone()));
        WatcherHandle {
            cancel,
            state,
            join,
        }
    }

    /// Run until `cancel` fires or the end bound is reached.
    ///
    /// Only configuration errors are returned; remote, decode and handler
    /// failures are logged and the loop carries on.
    pub async fn run(self, cancel: CancellationToken) -> Result<ScanSummary, WatcherError> {
        if !self.config.enabled {
            tracing::info!("watcher disabled");
            self.set_state(WatcherState::Stopped);
            return Ok(ScanSummary::default());
        }
        self.config.check()?;
        if self.handlers.is_empty() {
            tracing::warn!("no handler registered");
        }

        self.set_state(WatcherState::Resolving);
        let Some(head) = self.initial_head(&cancel).await else {
            self.set_state(WatcherState::Stopped);
            return Ok(ScanSummary::default());
        };
        let resolution = match resolve_window(self.config.start(), self.config.end(), head) {
            Ok(r) => r,
            Err(e) => {
                self.set_state(WatcherState::Stopped);
                return Err(e);
            }
        };
        tracing::info!(
            start = resolution.window.start,
            end = ?resolution.window.end,
            head,
            "start scan block"
        );

        let summary = self.scan(resolution, &cancel).await;
        self.set_state(WatcherState::Stopped);
        tracing::info!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            handler_failures = summary.handler_failures,
            next = summary.next_height,
            "watcher stopped"
        );
        Ok(summary)
    }

    async fn scan(&self, resolution: Resolution, cancel: &CancellationToken) -> ScanSummary {
        let window = resolution.window;
        let mut summary = ScanSummary {
            window: Some(window),
            ..Default::default()
        };
        let handlers = Arc::new(self.handlers.clone());
        let dispatch_cancel = cancel.child_token();
        let mut pool = DispatchPool::new(self.config.pool_size);
        let handler_failures = Arc::new(AtomicU64::new(0));
        let mut rate_timer = Instant::now();

        let mut next = resolution.first_height();
        let mut last_head = resolution.head;
        // A head fetched while tailing that is ahead of `next`, kept until
        // catch-up reaches its height.
        let mut pending_head: Option<RawBlock> = None;

        loop {
            if cancel.is_cancelled() || window.is_exhausted(next) {
                break;
            }

            let (block, phase) = if next > last_head {
                self.set_state(WatcherState::Tailing);
                let Some(head) = self.wait_for_head(next, cancel).await else {
                    break;
                };
                if head.height > next {
                    last_head = head.height;
                    pending_head = Some(head);
                    continue;
                }
                match Block::decode(head) {
                    Ok(block) => {
                        last_head = block.height;
                        (block, ScanPhase::Tail)
                    }
                    Err(e) => {
                        // cursor stays put, the next head poll retries it
                        tracing::warn!(height = next, error = %e, "decode head block failed");
                        continue;
                    }
                }
            } else {
                self.set_state(WatcherState::CatchingUp);
                let raw = match pending_head.take() {
                    Some(head) if head.height == next => Ok(head),
                    other => {
                        pending_head = other;
                        self.fetch_at(next).await
                    }
                };
                match raw.and_then(Block::decode) {
                    Ok(block) => (block, ScanPhase::CatchUp),
                    Err(e) => {
                        summary.failed += 1;
                        tracing::warn!(height = next, error = %e, "fetch block failed");
                        log_progress(next, &mut rate_timer);
                        next += 1;
                        continue;
                    }
                }
            };

            log_progress(next, &mut rate_timer);

            let block = Arc::new(block);
            let handlers = Arc::clone(&handlers);
            let handler_failures = Arc::clone(&handler_failures);
            let ctx = DispatchContext {
                phase,
                cancel: dispatch_cancel.clone(),
            };
            let spawned = pool
                .spawn(async move {
                    let report = handlers.dispatch(&block, &ctx).await;
                    handler_failures.fetch_add(report.failed as u64, Ordering::Relaxed);
                })
                .await;
            if let Err(e) = spawned {
                tracing::error!(height = next, error = %e, "dispatch failed");
                break;
            }
            summary.dispatched += 1;

            next += 1;
        }

        summary.next_height = next;
        self.set_state(WatcherState::Draining);
        tracing::info!(in_flight = pool.in_flight(), "wait for all dispatches to finish");
        pool.drain().await;
        summary.handler_failures = handler_failures.load(Ordering::Relaxed);
        summary
    }

    /// Read the chain head for window resolution, retrying until it
    /// succeeds. `None` if cancelled first.
    async fn initial_head(&self, cancel: &CancellationToken) -> Option<i64> {
        loop {
            match self.fetcher.latest_block().await {
                Ok(block) => return Some(block.height),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to get latest block");
                }
            }
            if !self.pause(cancel).await {
                return None;
            }
        }
    }

    /// Poll the head until it reaches `next`. `None` if cancelled first.
    async fn wait_for_head(&self, next: i64, cancel: &CancellationToken) -> Option<RawBlock> {
        loop {
            if !self.pause(cancel).await {
                return None;
            }
            match self.fetcher.latest_block().await {
                Ok(head) if head.height >= next => return Some(head),
                Ok(head) => {
                    tracing::trace!(head = head.height, next, "no new block");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "query latest block error");
                }
            }
        }
    }

    async fn fetch_at(&self, height: i64) -> Result<RawBlock, WatcherError> {
        let block = self.fetcher.block_at(height).await?;
        if block.height != height {
            return Err(WatcherError::Rpc(format!(
                "requested block {height}, node returned {}",
                block.height
            )));
        }
        Ok(block)
    }

    /// Sleep one poll interval. Returns `false` if cancelled meanwhile.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.poll_interval()) => true,
        }
    }

    fn set_state(&self, state: WatcherState) {
        let prev = self.state.send_replace(state);
        if prev != state {
            tracing::debug!(from = %prev, to = %state, "watcher state");
        }
    }
}

fn log_progress(height: i64, rate_timer: &mut Instant) {
    if height % PROGRESS_LOG_EVERY == 0 {
        tracing::info!(height, "new block");
    }
    if height % RATE_LOG_EVERY == 0 {
        let secs = rate_timer.elapsed().as_secs_f64();
        if secs > 0.0 {
            tracing::info!(rate = RATE_LOG_EVERY as f64 / secs, "sync block rate (blocks/s)");
        }
        *rate_timer = Instant::now();
    }
}

// ─── WatcherHandle ───────────────────────────────────────────────────────────

/// Handle to a watcher running on a background task.
pub struct WatcherHandle {
    cancel: CancellationToken,
    state: watch::Receiver<WatcherState>,
    join: JoinHandle<Result<ScanSummary, WatcherError>>,
}

impl WatcherHandle {
    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// A clone of the watcher's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the watcher and wait until every in-flight dispatch finished.
    pub async fn close(self) -> Result<ScanSummary, WatcherError> {
        tracing::info!("close watcher");
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the watcher to stop on its own (bounded end height).
    pub async fn wait(self) -> Result<ScanSummary, WatcherError> {
        self.join
            .await
            .map_err(|e| WatcherError::Other(format!("watcher task failed: {e}")))?
    }
}
