/// Dual-Dex Arbitrage Bot
///
/// Evaluates two-router routes against a settlement contract's on-chain
/// quote and executes profitable ones, one trade at a time.
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use ethers::prelude::*;
use ethers::providers::{Provider, Ws};
use ethers_signers::{LocalWallet, Signer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{filter, prelude::*};

use dual_dex_arb::config::NetworkConfig;
use dual_dex_arb::types::Timing;
use dual_dex_arb::{DualDexStrategy, OnChainVenue};

/// CLI Options for the dual-dex arbitrage bot
#[derive(Parser, Debug)]
#[command(name = "dualdex")]
#[command(about = "Dual-dex arbitrage bot", long_about = None)]
pub struct Args {
    /// Node WebSocket endpoint (e.g., wss://mainnet.aurora.dev)
    #[arg(long, env = "WSS")]
    pub wss: String,

    /// Private key of the settlement contract owner (64 hex chars, no 0x prefix)
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: String,

    /// Network name; selects `<config-dir>/<network>.json`
    #[arg(long, env = "NETWORK", default_value = "aurora")]
    pub network: String,

    /// Directory holding network files
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Directory for the discovered-route log
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Number of concurrent evaluation workers
    #[arg(long, env = "WORKERS", default_value = "10")]
    pub workers: usize,

    /// Delay between evaluation passes of a worker, in milliseconds
    #[arg(long, env = "POLL_MS", default_value = "1000")]
    pub poll_ms: u64,

    /// Delay after a failed quote or trade, in milliseconds
    #[arg(long, env = "BACKOFF_MS", default_value = "1000")]
    pub backoff_ms: u64,

    /// Delay before the first balance report, in seconds
    #[arg(long, env = "REPORT_DELAY_SECS", default_value = "120")]
    pub report_delay_secs: u64,

    /// Period between balance reports, in seconds
    #[arg(long, env = "REPORT_INTERVAL_SECS", default_value = "600")]
    pub report_interval_secs: u64,

    /// Timeout for quote and balance calls, in seconds
    #[arg(long, env = "CALL_TIMEOUT_SECS", default_value = "30")]
    pub call_timeout_secs: u64,

    /// Timeout for trade submission plus confirmation, in seconds
    #[arg(long, env = "CONFIRM_TIMEOUT_SECS", default_value = "180")]
    pub confirm_timeout_secs: u64,

    /// Re-quote cached routes older than this many seconds (default: never)
    #[arg(long, env = "CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,
}

impl Args {
    fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_millis(self.poll_ms),
            failure_backoff: Duration::from_millis(self.backoff_ms),
            report_delay: Duration::from_secs(self.report_delay_secs),
            report_interval: Duration::from_secs(self.report_interval_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            confirm_timeout: Duration::from_secs(self.confirm_timeout_secs),
            cache_ttl: self.cache_ttl_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    // Set up tracing/logging
    let filter = filter::Targets::new()
        .with_target("dual_dex_arb", Level::INFO)
        .with_target("dualdex", Level::INFO);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Dual-Dex Arbitrage Bot");

    // Parse command-line arguments (with .env fallback)
    let args = Args::parse();

    // Load and validate the network file; any error here is fatal
    let network = NetworkConfig::load(&args.config_dir, &args.network)?;
    let config = network.into_config(&args.network, &args.data_dir, args.workers, args.timing())?;

    info!(
        network = %config.network,
        settlement = ?config.settlement_contract,
        routes = config.routes.len(),
        base_assets = config.base_assets.len(),
        routers = config.routers.len(),
        min_bps = config.min_basis_points_per_trade,
        "Configuration loaded"
    );

    // Connect via WebSocket
    info!("Connecting to node...");
    let ws = Ws::connect(&args.wss).await?;
    let provider = Provider::new(ws);

    // Set up wallet
    let chain_id = provider.get_chainid().await?.as_u64();
    let wallet: LocalWallet = args.private_key.parse::<LocalWallet>()?.with_chain_id(chain_id);
    let address = wallet.address();
    info!(owner = ?address, chain_id, "Wallet loaded");

    // Wrap provider with signer and nonce manager
    let provider = Arc::new(provider.nonce_manager(address).with_signer(wallet));

    let venue = Arc::new(OnChainVenue::new(provider, config.settlement_contract));
    let strategy = Arc::new(DualDexStrategy::init(venue, &config).await?);

    info!("Bot is now running. Press Ctrl+C to stop.");
    let mut set = strategy.run();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            set.abort_all();
        }
        Some(res) = set.join_next() => {
            if let Err(e) = res {
                tracing::error!("Task error: {:?}", e);
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}
