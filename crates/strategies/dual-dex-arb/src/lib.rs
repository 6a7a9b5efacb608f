/// Dual-Dex Arbitrage Strategy
///
/// Evaluates two-hop routes (buy on one router, sell on another) against a
/// settlement contract's on-chain quote and executes the first profitable
/// one, never with more than one trade in flight.
///
/// ## Architecture
///
/// - **Route store**: configured routes round-robin, or random discovery
/// - **Profitability cache**: one verdict per route, shared by all workers
/// - **Estimator**: quote vs. principal plus minimum margin
/// - **Executor**: guarded submission and confirmation
/// - **Balance tracker**: startup snapshot and periodic drift report
///
/// ## Key Components
///
/// - `types`: routes, assets, outcomes and runtime configuration
/// - `config`: network file loading and validation
/// - `venue`: settlement contract seam and its `ethers` implementation
/// - `strategy`: the evaluation workers tying the rest together
/// - `bindings`: contract ABI bindings (external crate)
pub mod balances;
pub mod cache;
pub mod config;
pub mod error;
pub mod estimator;
pub mod executor;
pub mod routes;
pub mod strategy;
pub mod types;
pub mod venue;

// Re-exports for convenience
pub use error::{ArbError, ConfigError};
pub use strategy::DualDexStrategy;
pub use types::{Config, Route, Timing};
pub use venue::{OnChainVenue, SettlementVenue};
