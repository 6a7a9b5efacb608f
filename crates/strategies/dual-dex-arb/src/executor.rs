/// Trade execution with a process-wide single-trade-in-flight guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ethers::prelude::*;
use tracing::{debug, info};

use crate::error::ArbResult;
use crate::types::{Route, TradeOutcome};
use crate::venue::{bounded, SettlementVenue};

/// At most one trade in flight, process-wide
#[derive(Debug, Default)]
pub struct TradeGuard {
    in_flight: AtomicBool,
}

impl TradeGuard {
    /// Claim the guard, or `None` if another trade holds it
    pub fn try_acquire(&self) -> Option<TradePermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TradePermit { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the lifetime of one trade. Dropping it releases the guard,
/// whether the trade settled, failed, timed out, or its task was cancelled.
#[derive(Debug)]
pub struct TradePermit<'a> {
    guard: &'a TradeGuard,
}

impl Drop for TradePermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

pub struct TradeExecutor<V> {
    venue: Arc<V>,
    guard: TradeGuard,
    confirm_timeout: Duration,
}

impl<V: SettlementVenue> TradeExecutor<V> {
    pub fn new(venue: Arc<V>, confirm_timeout: Duration) -> Self {
        Self {
            venue,
            guard: TradeGuard::default(),
            confirm_timeout,
        }
    }

    pub fn guard(&self) -> &TradeGuard {
        &self.guard
    }

    /// Submit a dual-dex trade and wait for it to settle.
    ///
    /// Returns [`TradeOutcome::Busy`] at once, without queueing, when another
    /// trade is in flight. Submission, revert and timeout are errors; the
    /// guard is released on every path.
    ///
    /// The deadline covers submission and confirmation together. If it fires
    /// after the transaction was broadcast, the guard is released while that
    /// transaction may still be pending, so the next trade can land before it
    /// settles. Keep `confirm_timeout` well above the chain's normal inclusion
    /// time to make that rare.
    pub async fn execute(&self, route: &Route, amount: U256) -> ArbResult<TradeOutcome> {
        let Some(_permit) = self.guard.try_acquire() else {
            debug!(route = %route.id(), "Trade already in flight, skipping");
            return Ok(TradeOutcome::Busy);
        };

        info!(route = %route.id(), amount = %amount, "> Making dual trade");
        let settlement = bounded("trade", self.confirm_timeout, self.venue.trade(route, amount)).await?;
        info!(
            route = %route.id(),
            tx = ?settlement.tx_hash,
            block = ?settlement.block_number,
            gas_used = ?settlement.gas_used,
            "Dual trade settled"
        );

        Ok(TradeOutcome::Settled(settlement))
    }
}
