/// Balance tracker
///
/// Snapshots the settlement contract's base-asset balances at startup and
/// periodically reports how far each has drifted, in basis points. Workers
/// only read from it (to size trades); it is only written inside its own
/// reporting cycle, and never holds its lock across an external call.

use std::sync::Arc;
use std::time::Duration;

use ethers::prelude::*;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::ArbResult;
use crate::types::{saturating_signed, Asset};
use crate::venue::{bounded, SettlementVenue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub symbol: String,
    pub address: Address,
    pub start_balance: U256,
    pub balance: U256,
}

impl BalanceSnapshot {
    pub fn drift_bps(&self) -> Option<I256> {
        drift_bps(self.start_balance, self.balance)
    }
}

/// Basis-point drift per asset; `bps` is `None` when there is no baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDrift {
    pub symbol: String,
    pub address: Address,
    pub bps: Option<I256>,
}

/// `(current - start) * 10000 / start`, undefined for a zero start balance
pub fn drift_bps(start: U256, current: U256) -> Option<I256> {
    if start.is_zero() {
        return None;
    }
    let (negative, diff) = if current >= start {
        (false, current - start)
    } else {
        (true, start - current)
    };
    let bps = diff.full_mul(U256::from(10_000)) / U512::from(start);
    // a drift too large for U256 is clamped along with the I256 conversion
    let bps = U256::try_from(bps).unwrap_or(U256::MAX);
    Some(saturating_signed(negative, bps))
}

pub struct BalanceTracker<V> {
    venue: Arc<V>,
    snapshots: RwLock<Vec<BalanceSnapshot>>,
    call_timeout: Duration,
}

impl<V: SettlementVenue> BalanceTracker<V> {
    /// Read every asset's starting balance. Any failure aborts startup.
    pub async fn snapshot(venue: Arc<V>, assets: &[Asset], call_timeout: Duration) -> ArbResult<Self> {
        let mut snapshots = Vec::with_capacity(assets.len());
        for asset in assets {
            let balance = bounded(
                "balance read",
                call_timeout,
                venue.balance_of(asset.address),
            )
            .await?;
            info!(symbol = %asset.symbol, balance = %balance, "Starting balance");
            snapshots.push(BalanceSnapshot {
                symbol: asset.symbol.clone(),
                address: asset.address,
                start_balance: balance,
                balance,
            });
        }

        Ok(Self::from_snapshots(venue, snapshots, call_timeout))
    }

    pub fn from_snapshots(venue: Arc<V>, snapshots: Vec<BalanceSnapshot>, call_timeout: Duration) -> Self {
        Self {
            venue,
            snapshots: RwLock::new(snapshots),
            call_timeout,
        }
    }

    pub async fn snapshots(&self) -> Vec<BalanceSnapshot> {
        self.snapshots.read().await.clone()
    }

    /// Trade size: the first tracked balance above zero.
    ///
    /// Deliberately naive. The size is taken in whichever asset comes first,
    /// not the route's source asset, and no allocation is optimised.
    pub async fn trade_size(&self) -> Option<U256> {
        self.snapshots
            .read()
            .await
            .iter()
            .map(|s| s.balance)
            .find(|b| !b.is_zero())
    }

    /// Re-read every balance and log drift from the starting snapshot.
    ///
    /// An asset whose read fails keeps its previous balance and is left out
    /// of the returned report.
    pub async fn report(&self) -> Vec<BalanceDrift> {
        let assets: Vec<(String, Address)> = self
            .snapshots
            .read()
            .await
            .iter()
            .map(|s| (s.symbol.clone(), s.address))
            .collect();

        let mut fresh = Vec::with_capacity(assets.len());
        for (symbol, address) in assets {
            match bounded("balance read", self.call_timeout, self.venue.balance_of(address)).await {
                Ok(balance) => fresh.push((address, balance)),
                Err(e) => warn!(symbol = %symbol, error = %e, "Failed to read balance"),
            }
        }

        let mut snapshots = self.snapshots.write().await;
        let mut drifts = Vec::with_capacity(fresh.len());
        for (address, balance) in fresh {
            if let Some(snapshot) = snapshots.iter_mut().find(|s| s.address == address) {
                snapshot.balance = balance;
                drifts.push(BalanceDrift {
                    symbol: snapshot.symbol.clone(),
                    address,
                    bps: snapshot.drift_bps(),
                });
            }
        }
        drop(snapshots);

        info!("############# BALANCES #############");
        for drift in &drifts {
            match drift.bps {
                Some(bps) => info!(symbol = %drift.symbol, bps = %bps, "Balance drift"),
                None => info!(symbol = %drift.symbol, "Balance drift: no baseline"),
            }
        }

        drifts
    }

    /// Report after `delay`, then every `interval`, forever
    pub async fn run(&self, delay: Duration, interval: Duration) {
        tokio::time::sleep(delay).await;
        loop {
            self.report().await;
            tokio::time::sleep(interval).await;
        }
    }
}
