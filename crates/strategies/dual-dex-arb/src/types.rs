/// Types shared by the dual-dex arbitrage components

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use ethers::prelude::*;
use serde::{Deserialize, Serialize};

/// A two-hop trade path: buy `token_dest` with `token_source` on `router_a`,
/// then sell it back on `router_b`.
///
/// Serialized as the 4-element address array `[router_a, router_b, token_source, token_dest]`,
/// which is both the network-file route format and the discovery-log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[Address; 4]", into = "[Address; 4]")]
pub struct Route {
    pub router_a: Address,
    pub router_b: Address,
    pub token_source: Address,
    pub token_dest: Address,
}

impl Route {
    pub fn new(router_a: Address, router_b: Address, token_source: Address, token_dest: Address) -> Self {
        Self {
            router_a,
            router_b,
            token_source,
            token_dest,
        }
    }

    /// Stable identity used as the profitability cache key
    pub fn id(&self) -> RouteId {
        RouteId([self.router_a, self.router_b, self.token_source, self.token_dest])
    }

    /// A route that sells an asset for itself can never be settled
    pub fn is_self_pair(&self) -> bool {
        self.token_source == self.token_dest
    }
}

impl From<[Address; 4]> for Route {
    fn from([router_a, router_b, token_source, token_dest]: [Address; 4]) -> Self {
        Self::new(router_a, router_b, token_source, token_dest)
    }
}

impl From<Route> for [Address; 4] {
    fn from(route: Route) -> Self {
        route.id().0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(pub [Address; 4]);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r1, r2, t1, t2] = &self.0;
        write!(f, "{:?}>{:?} {:?}/{:?}", r1, r2, t1, t2)
    }
}

/// An ERC20 asset from the network file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "sym")]
    pub symbol: String,
    pub address: Address,
}

/// An external venue router from the network file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    #[serde(rename = "dex", default)]
    pub name: String,
    pub address: Address,
}

/// Signed quote margin: amount back minus the profit target.
///
/// Only produced by a successful quote, so a cached value always means
/// "evaluated"; a failed evaluation never becomes a `Profitability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profitability {
    pub margin: I256,
}

impl Profitability {
    /// Margin of `amount_back` over `profit_target`, saturated into `I256`.
    /// The sign is exact even when the magnitude is clamped.
    pub fn from_quote(amount_back: U256, profit_target: U256) -> Self {
        let margin = if amount_back >= profit_target {
            saturating_signed(false, amount_back - profit_target)
        } else {
            saturating_signed(true, profit_target - amount_back)
        };
        Self { margin }
    }

    /// Strictly above target; breaking even on the margin is not a trade
    pub fn is_profitable(&self) -> bool {
        self.margin > I256::zero()
    }
}

/// `abs` with a sign, clamped to `I256::MAX` / `I256::MIN`
pub fn saturating_signed(negative: bool, abs: U256) -> I256 {
    let max = I256::MAX.into_raw();
    match (negative, abs > max) {
        (false, false) => I256::from_raw(abs),
        (false, true) => I256::MAX,
        (true, false) => -I256::from_raw(abs),
        (true, true) => I256::MIN,
    }
}

/// Confirmed settlement of a dual-dex trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub tx_hash: TxHash,
    pub block_number: Option<U64>,
    pub gas_used: Option<U256>,
}

/// Result of asking the executor to trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    /// Trade was submitted and confirmed
    Settled(Settlement),
    /// Another trade is in flight; nothing was submitted
    Busy,
}

/// What one evaluation pass of a worker ended with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// Route quoted (or cached) below target
    Unprofitable,
    /// Profitable, but another worker holds the trade guard
    Busy,
    /// Profitable and settled
    Traded(Settlement),
}

/// Intervals and deadlines for the evaluation and reporting loops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    /// Delay between evaluation passes of a worker
    pub poll_interval: Duration,

    /// Delay after a failed quote or trade before the worker retries
    pub failure_backoff: Duration,

    /// Delay between startup snapshot and the first balance report
    pub report_delay: Duration,

    /// Period between balance reports
    pub report_interval: Duration,

    /// Upper bound on read calls (quotes, balances)
    pub call_timeout: Duration,

    /// Upper bound on trade submission plus confirmation
    pub confirm_timeout: Duration,

    /// Lifetime of a cached profitability verdict; `None` keeps entries forever
    pub cache_ttl: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            failure_backoff: Duration::from_secs(1),
            report_delay: Duration::from_secs(120),
            report_interval: Duration::from_secs(600),
            call_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(180),
            cache_ttl: None,
        }
    }
}

/// Runtime configuration for the arbitrage strategy, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Network name, used for the discovery log file name
    pub network: String,

    /// Address of the deployed settlement contract; also the balance holder
    pub settlement_contract: Address,

    /// Assets whose balances are tracked and which source discovered routes
    pub base_assets: Vec<Asset>,

    /// Destination pool for discovered routes (base assets when empty)
    pub tokens: Vec<Asset>,

    /// Router pool for discovered routes
    pub routers: Vec<Router>,

    /// Preconfigured routes; empty means discovery mode
    pub routes: Vec<Route>,

    /// Minimum margin over principal, in basis points (e.g., 50 = 0.50%)
    pub min_basis_points_per_trade: u32,

    /// Number of concurrent evaluation workers
    pub workers: usize,

    pub timing: Timing,

    /// Append-only log of profitable routes found in discovery mode
    pub discovery_log: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: "aurora".to_string(),
            settlement_contract: Address::zero(),
            base_assets: vec![],
            tokens: vec![],
            routers: vec![],
            routes: vec![],
            min_basis_points_per_trade: 50, // 0.50% over principal
            workers: 10,
            timing: Timing::default(),
            discovery_log: PathBuf::from("data/aurora_RouteLog.txt"),
        }
    }
}

impl Config {
    pub fn discovery_mode(&self) -> bool {
        self.routes.is_empty()
    }
}
