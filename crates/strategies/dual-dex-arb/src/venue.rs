/// Settlement contract seam
///
/// The strategy only ever talks to the chain through [`SettlementVenue`]:
/// a dual-hop quote, a dual-hop trade that resolves once confirmed, and
/// ERC20 balance reads. [`OnChainVenue`] is the `ethers` implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::prelude::*;
use tracing::debug;

use dual_dex_bindings::{DualDexArb, ERC20};
use crate::error::{ArbError, ArbResult};
use crate::types::{Route, Settlement};

#[async_trait]
pub trait SettlementVenue: Send + Sync {
    /// Expected amount of `token_source` back after trading `size` along `route`
    async fn quote(&self, route: &Route, size: U256) -> ArbResult<U256>;

    /// Submit the dual-hop trade and wait until it is mined
    async fn trade(&self, route: &Route, size: U256) -> ArbResult<Settlement>;

    /// Balance of `asset` held by the settlement contract
    async fn balance_of(&self, asset: Address) -> ArbResult<U256>;
}

/// Settlement contract reached through an `ethers` middleware stack
pub struct OnChainVenue<M: Middleware> {
    client: Arc<M>,
    arb: DualDexArb<M>,
    holder: Address,
}

impl<M: Middleware + 'static> OnChainVenue<M> {
    /// Balances are read for the settlement contract itself, which holds the trading funds
    pub fn new(client: Arc<M>, settlement_contract: Address) -> Self {
        let arb = DualDexArb::new(settlement_contract, client.clone());
        Self {
            client,
            arb,
            holder: settlement_contract,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> SettlementVenue for OnChainVenue<M> {
    async fn quote(&self, route: &Route, size: U256) -> ArbResult<U256> {
        self.arb
            .estimate_dual_dex_trade(
                route.router_a,
                route.router_b,
                route.token_source,
                route.token_dest,
                size,
            )
            .call()
            .await
            .map_err(|e| ArbError::Quote(e.to_string()))
    }

    async fn trade(&self, route: &Route, size: U256) -> ArbResult<Settlement> {
        let call = self.arb.dual_dex_trade(
            route.router_a,
            route.router_b,
            route.token_source,
            route.token_dest,
            size,
        );

        let pending = call
            .send()
            .await
            .map_err(|e| ArbError::Submission(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        debug!(tx = ?tx_hash, "Trade submitted, awaiting confirmation");

        let receipt = pending
            .await
            .map_err(|e| ArbError::Submission(e.to_string()))?
            .ok_or(ArbError::Dropped(tx_hash))?;

        if receipt.status == Some(U64::zero()) {
            return Err(ArbError::Reverted(tx_hash));
        }

        Ok(Settlement {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }

    async fn balance_of(&self, asset: Address) -> ArbResult<U256> {
        ERC20::new(asset, self.client.clone())
            .balance_of(self.holder)
            .call()
            .await
            .map_err(|e| ArbError::BalanceRead {
                asset,
                reason: e.to_string(),
            })
    }
}

/// Bound an external call; an elapsed deadline is an ordinary failure
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, call: F) -> ArbResult<T>
where
    F: Future<Output = ArbResult<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ArbError::Timeout { operation, timeout })?
}
