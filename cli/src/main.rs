//! blockwatch CLI — follow a Cosmos chain and log every block.
//!
//! # Commands
//! ```text
//! blockwatch run   --config blockwatch.toml [--rpc-url <url>] [--start <h>] [--end <h>]
//! blockwatch check --config blockwatch.toml
//! blockwatch info
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use blockwatch_core::{EndHeight, StartHeight, WatcherBuilder, WatcherConfig};
use blockwatch_cosmos::CometFetcher;
use clap::{Parser, Subcommand};

mod block_logger;
mod logging;
mod settings;

use block_logger::BlockLogger;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "blockwatch",
    about = "Watch a Cosmos SDK chain block by block",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watcher until Ctrl-C or the configured end height
    Run {
        /// Path to the TOML configuration file
        #[arg(short, long, env = "BLOCKWATCH_CONFIG", default_value = "blockwatch.toml")]
        config: PathBuf,
        /// Override `watcher.rpc_url`
        #[arg(long, env = "BLOCKWATCH_RPC_URL")]
        rpc_url: Option<String>,
        /// Override `watcher.start_height` (-1 follows the head)
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,
        /// Override `watcher.end_height` (0 stops at the startup head, -1 never stops)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,
        /// Log every transaction, not only block summaries
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a configuration file and print the resolved settings
    Check {
        #[arg(short, long, env = "BLOCKWATCH_CONFIG", default_value = "blockwatch.toml")]
        config: PathBuf,
    },

    /// Show defaults and build info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, rpc_url, start, end, verbose } => {
            cmd_run(&config, rpc_url, start, end, verbose).await
        }
        Commands::Check { config } => cmd_check(&config),
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_run(
    path: &std::path::Path,
    rpc_url: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
    verbose: bool,
) -> Result<()> {
    let mut settings = Settings::load(path)?;
    if let Some(url) = rpc_url {
        settings.watcher.rpc_url = url;
    }
    if let Some(h) = start {
        settings.watcher.start_height = h;
    }
    if let Some(h) = end {
        settings.watcher.end_height = h;
    }
    settings.check()?;
    logging::init_tracing(&settings.log);

    let fetcher = CometFetcher::connect(settings.watcher.rpc_url.clone())
        .context("creating RPC client")?;
    let handle = WatcherBuilder::from_config(settings.watcher)
        .handler(Arc::new(BlockLogger::new(verbose)))
        .build(fetcher)
        .spawn();

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C, shutting down");
            cancel.cancel();
        }
    });

    let summary = handle.wait().await?;
    tracing::info!(
        dispatched = summary.dispatched,
        failed = summary.failed,
        handler_failures = summary.handler_failures,
        next_height = summary.next_height,
        "watcher stopped"
    );
    Ok(())
}

fn cmd_check(path: &std::path::Path) -> Result<()> {
    let settings = Settings::load(path)?;
    settings.check()?;

    let w = &settings.watcher;
    println!("Configuration OK: {}", path.display());
    println!("  enabled:       {}", w.enabled);
    println!("  rpc_url:       {}", w.rpc_url);
    println!("  start:         {}", describe_start(w.start()));
    println!("  end:           {}", describe_end(w.end()));
    println!("  poll interval: {}ms", w.poll_interval_ms);
    println!("  pool size:     {}", w.pool_size);
    println!("  log level:     {}{}", settings.log.level, if settings.log.json { " (json)" } else { "" });
    Ok(())
}

fn cmd_info() {
    let d = WatcherConfig::default();
    println!("blockwatch v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default poll interval: {}ms", d.poll_interval_ms);
    println!("  Default start: {}", describe_start(d.start()));
    println!("  Default end: {}", describe_end(d.end()));
    println!("  Default dispatch pool size: {}", d.pool_size);
    println!("  Backend: CometBFT JSON-RPC (block, tx)");
    println!("  Transactions: cosmos.tx.v1beta1 protobuf envelopes");
}

fn describe_start(start: StartHeight) -> String {
    match start {
        StartHeight::Head => "chain head at startup".into(),
        StartHeight::At(h) => h.to_string(),
    }
}

fn describe_end(end: EndHeight) -> String {
    match end {
        EndHeight::Unbounded => "never (follow the chain)".into(),
        EndHeight::Head => "chain head at startup".into(),
        EndHeight::At(h) => format!("{h} (exclusive)"),
    }
}
