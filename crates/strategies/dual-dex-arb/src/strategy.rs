/// Evaluation workers: select a route, check the cache or quote it, trade if profitable

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::balances::BalanceTracker;
use crate::cache::ProfitabilityCache;
use crate::error::{ArbError, ArbResult, ConfigError};
use crate::estimator::Estimator;
use crate::executor::TradeExecutor;
use crate::routes::RouteStore;
use crate::types::{Config, Cycle, Timing, TradeOutcome};
use crate::venue::SettlementVenue;

/// Dual-dex arbitrage strategy.
/// Every worker shares the route cursor, the profitability cache, the trade
/// guard and the balance snapshot; nothing else is shared.
pub struct DualDexStrategy<V> {
    routes: RouteStore,
    cache: ProfitabilityCache,
    estimator: Estimator<V>,
    executor: TradeExecutor<V>,
    balances: BalanceTracker<V>,
    timing: Timing,
    workers: usize,
}

impl<V: SettlementVenue + 'static> DualDexStrategy<V> {
    /// Snapshot starting balances and build the strategy
    pub async fn init(venue: Arc<V>, config: &Config) -> Result<Self> {
        let balances = BalanceTracker::snapshot(
            venue.clone(),
            &config.base_assets,
            config.timing.call_timeout,
        )
        .await
        .context("Failed to snapshot starting balances")?;

        Ok(Self::with_balances(venue, config, balances)?)
    }

    /// `config` is expected to come from `NetworkConfig::into_config`, which
    /// rejects a zero worker count
    pub fn with_balances(
        venue: Arc<V>,
        config: &Config,
        balances: BalanceTracker<V>,
    ) -> Result<Self, ConfigError> {
        let routes = RouteStore::from_config(config)?;
        info!(
            discovery = routes.is_discovery(),
            routes = config.routes.len(),
            workers = config.workers,
            min_bps = config.min_basis_points_per_trade,
            "Strategy initialized"
        );

        Ok(Self {
            routes,
            cache: ProfitabilityCache::with_ttl(config.timing.cache_ttl),
            estimator: Estimator::new(
                venue.clone(),
                config.min_basis_points_per_trade,
                config.timing.call_timeout,
            ),
            executor: TradeExecutor::new(venue, config.timing.confirm_timeout),
            balances,
            timing: config.timing.clone(),
            workers: config.workers,
        })
    }

    pub fn cache(&self) -> &ProfitabilityCache {
        &self.cache
    }

    pub fn executor(&self) -> &TradeExecutor<V> {
        &self.executor
    }

    pub fn balances(&self) -> &BalanceTracker<V> {
        &self.balances
    }

    /// One pass: select, estimate (or hit the cache), trade if profitable.
    ///
    /// A failed quote or trade comes back as `Err` and leaves the cache
    /// without a verdict for the route. Any trade attempt that got past the
    /// guard drops the route's cached verdict, since it no longer describes
    /// the chain.
    pub async fn evaluate_once(&self) -> ArbResult<Cycle> {
        let route = self.routes.select_route();
        let trade_size = self
            .balances
            .trade_size()
            .await
            .ok_or(ArbError::NoFundedAsset)?;

        let profitability = self
            .cache
            .get_or_estimate(&route, || self.estimator.estimate(&route, trade_size))
            .await?;

        if !profitability.is_profitable() {
            debug!(route = %route.id(), margin = %profitability.margin, "Route below target");
            return Ok(Cycle::Unprofitable);
        }

        info!(route = %route.id(), margin = %profitability.margin, "Profitable route found");

        // logged whether or not the trade goes through
        if let Err(e) = self.routes.record_discovery(&route).await {
            warn!(route = %route.id(), error = %e, "Failed to log discovered route");
        }

        let outcome = self.executor.execute(&route, trade_size).await;
        if !matches!(outcome, Ok(TradeOutcome::Busy)) {
            self.cache.invalidate(&route);
        }

        match outcome? {
            TradeOutcome::Settled(settlement) => Ok(Cycle::Traded(settlement)),
            TradeOutcome::Busy => Ok(Cycle::Busy),
        }
    }

    /// Worker loop; never returns.
    ///
    /// A settled trade goes straight into the next pass to catch a follow-up
    /// opportunity. Anything else waits a poll interval, failures wait the
    /// failure backoff.
    pub async fn run_worker(&self, worker: usize) {
        debug!(worker, "Worker started");
        loop {
            match self.evaluate_once().await {
                Ok(Cycle::Traded(_)) => continue,
                Ok(Cycle::Unprofitable) | Ok(Cycle::Busy) => {
                    tokio::time::sleep(self.timing.poll_interval).await;
                }
                Err(e) => {
                    warn!(worker, error = %e, "Evaluation failed");
                    tokio::time::sleep(self.timing.failure_backoff).await;
                }
            }
        }
    }

    /// Spawn the balance reporter and the evaluation workers
    pub fn run(self: Arc<Self>) -> JoinSet<()> {
        let mut set = JoinSet::new();

        let reporter = self.clone();
        set.spawn(async move {
            reporter
                .balances
                .run(reporter.timing.report_delay, reporter.timing.report_interval)
                .await;
        });

        for worker in 0..self.workers {
            let strategy = self.clone();
            set.spawn(async move { strategy.run_worker(worker).await });
        }

        info!(workers = self.workers, "Evaluation workers spawned");
        set
    }
}
