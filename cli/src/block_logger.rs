use async_trait::async_trait;
use blockwatch_core::{Block, BlockHandler, DispatchContext, WatcherError};

/// Logs one line per delivered block.
#[derive(Debug, Default)]
pub struct BlockLogger {
    /// Also log each transaction's hash and message types.
    pub verbose: bool,
}

impl BlockLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl BlockHandler for BlockLogger {
    fn name(&self) -> &str {
        "block-logger"
    }

    async fn handle_block(&self, block: &Block, ctx: &DispatchContext) -> Result<(), WatcherError> {
        tracing::info!(
            chain_id = %block.chain_id,
            height = block.height,
            time = %block.time,
            txs = block.tx_count(),
            phase = ?ctx.phase,
            "block"
        );
        if self.verbose {
            for (hash, tx) in block.iter_txs() {
                let msgs: Vec<&str> = tx.message_types().collect();
                tracing::info!(height = block.height, hash = %hash, msgs = ?msgs, memo = tx.memo(), "tx");
            }
        }
        Ok(())
    }
}
