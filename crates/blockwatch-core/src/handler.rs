//! Block handler trait + ordered handler set.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::block::Block;
use crate::error::WatcherError;

/// Pause after a handler failure before the next handler runs.
pub const HANDLER_ERROR_PAUSE: Duration = Duration::from_millis(100);

/// Trait for user-provided block consumers.
///
/// Called at most once per delivered block. A failed call is logged and not
/// retried, so implementations must tolerate missing a block. Blocks of
/// different heights may be handled concurrently and complete out of order;
/// handlers needing strict ordering must sequence on [`Block::height`].
#[async_trait]
pub trait BlockHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Checked before every invocation. Must be side-effect free.
    fn enabled(&self) -> bool {
        true
    }

    async fn handle_block(&self, block: &Block, ctx: &DispatchContext) -> Result<(), WatcherError>;
}

/// Whether a block was reached while catching up or while tailing the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    CatchUp,
    Tail,
}

/// Context passed to handlers with each block.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub phase: ScanPhase,
    /// Cancelled when the watcher is shutting down. Advisory: the watcher
    /// still waits for the handler to return.
    pub cancel: CancellationToken,
}

impl DispatchContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Outcome of one block's fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Ordered collection of block handlers. Append-only; invocation order is
/// registration order.
#[derive(Clone)]
pub struct HandlerSet {
    handlers: Vec<Arc<dyn BlockHandler>>,
    error_pause: Duration,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self {
            handlers: vec![],
            error_pause: HANDLER_ERROR_PAUSE,
        }
    }

    pub fn register(&mut self, handler: Arc<dyn BlockHandler>) {
        self.handlers.push(handler);
    }

    /// Override the pause taken after a handler failure.
    pub fn set_error_pause(&mut self, pause: Duration) {
        self.error_pause = pause;
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every enabled handler on `block`, one after another.
    ///
    /// A failing or panicking handler is logged with the block height,
    /// followed by a short pause; the remaining handlers still run and the
    /// block counts as delivered.
    pub async fn dispatch(&self, block: &Block, ctx: &DispatchContext) -> DispatchReport {
        let mut report = DispatchReport::default();
        for handler in &self.handlers {
            if !handler.enabled() {
                report.skipped += 1;
                continue;
            }
            let outcome = AssertUnwindSafe(handler.handle_block(block, ctx))
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "handler panicked".to_string(),
            };
            report.failed += 1;
            tracing::warn!(
                handler = handler.name(),
                height = block.height,
                error = %error,
                "handle block failed"
            );
            tokio::time::sleep(self.error_pause).await;
        }
        report
    }
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
        enabled: AtomicBool,
    }

    impl Recorder {
        fn new(name: &str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                log: log.clone(),
                fail,
                enabled: AtomicBool::new(true),
            })
        }
    }

    #[async_trait]
    impl BlockHandler for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn enabled(&self) -> bool {
            self.enabled.load(Ordering::Relaxed)
        }
        async fn handle_block(&self, b: &Block, _c: &DispatchContext) -> Result<(), WatcherError> {
            self.log.lock().unwrap().push(format!("{}@{}", self.name, b.height));
            if self.fail {
                return Err(WatcherError::handler(&self.name, "boom"));
            }
            Ok(())
        }
    }

    struct Panicker(Arc<AtomicU32>);

    #[async_trait]
    impl BlockHandler for Panicker {
        async fn handle_block(&self, _b: &Block, _c: &DispatchContext) -> Result<(), WatcherError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            panic!("handler bug");
        }
    }

    fn block(height: i64) -> Block {
        Block {
            chain_id: "test-1".into(),
            height,
            time: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            tx_hashes: vec![],
            txs: vec![],
        }
    }

    fn ctx() -> DispatchContext {
        DispatchContext {
            phase: ScanPhase::CatchUp,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut set = HandlerSet::new();
        set.register(Recorder::new("a", &log, false));
        set.register(Recorder::new("b", &log, false));
        set.register(Recorder::new("c", &log, false));

        let report = set.dispatch(&block(7), &ctx()).await;

        assert_eq!(*log.lock().unwrap(), vec!["a@7", "b@7", "c@7"]);
        assert_eq!(report, DispatchReport { delivered: 3, failed: 0, skipped: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn failing_handler_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut set = HandlerSet::new();
        set.register(Recorder::new("bad", &log, true));
        set.register(Recorder::new("good", &log, false));

        let report = set.dispatch(&block(1), &ctx()).await;

        // invoked exactly once, no retry
        assert_eq!(*log.lock().unwrap(), vec!["bad@1", "good@1"]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_handlers_are_skipped() {
        let log = Arc::new(Mutex::new(vec![]));
        let off = Recorder::new("off", &log, false);
        off.enabled.store(false, Ordering::Relaxed);

        let mut set = HandlerSet::new();
        set.register(off);
        set.register(Recorder::new("on", &log, false));

        let report = set.dispatch(&block(3), &ctx()).await;
        assert_eq!(*log.lock().unwrap(), vec!["on@3"]);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_handler_is_contained() {
        let calls = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(vec![]));
        let mut set = HandlerSet::new();
        set.register(Arc::new(Panicker(calls.clone())));
        set.register(Recorder::new("after", &log, false));

        let report = set.dispatch(&block(9), &ctx()).await;
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(*log.lock().unwrap(), vec!["after@9"]);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_pause_is_applied() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut set = HandlerSet::new();
        set.register(Recorder::new("bad", &log, true));

        let started = tokio::time::Instant::now();
        set.dispatch(&block(1), &ctx()).await;
        assert!(started.elapsed() >= HANDLER_ERROR_PAUSE);
    }
}
