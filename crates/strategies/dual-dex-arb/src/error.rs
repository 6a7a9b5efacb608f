/// Error types for the dual-dex arbitrage strategy

use std::path::PathBuf;
use std::time::Duration;

use ethers::prelude::*;
use thiserror::Error;

/// Recoverable failures of a single evaluation or trade attempt.
///
/// None of these is a verdict on profitability: callers back off and retry,
/// and the profitability cache is left untouched.
#[derive(Debug, Error)]
pub enum ArbError {
    #[error("Quote call failed: {0}")]
    Quote(String),

    #[error("Trade submission failed: {0}")]
    Submission(String),

    #[error("Trade {0:?} dropped before confirmation")]
    Dropped(TxHash),

    #[error("Trade {0:?} reverted")]
    Reverted(TxHash),

    #[error("Balance read failed for {asset:?}: {reason}")]
    BalanceRead { asset: Address, reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} overflowed for {value}")]
    Overflow { operation: &'static str, value: U256 },

    #[error("No tracked asset has a positive balance to size a trade")]
    NoFundedAsset,

    #[error("Discovery log write failed: {0}")]
    DiscoveryLog(#[from] std::io::Error),
}

/// Fatal startup errors; the process exits before any worker runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read network file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse network file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Network file lists no base assets")]
    NoBaseAssets,

    #[error("Fixed route mode needs at least one route")]
    NoRoutes,

    #[error("Discovery mode needs at least one router")]
    NoRouters,

    #[error("Discovery mode needs a source and destination asset that differ")]
    NoDistinctPair,

    #[error("Configured route #{index} trades {asset:?} for itself")]
    SelfPairRoute { index: usize, asset: Address },

    #[error("Worker count must be at least 1")]
    NoWorkers,
}

pub type ArbResult<T> = Result<T, ArbError>;
