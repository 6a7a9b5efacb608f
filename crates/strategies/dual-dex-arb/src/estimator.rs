/// Profitability estimation against the settlement contract's dual-hop quote

use std::sync::Arc;
use std::time::Duration;

use ethers::prelude::*;
use tracing::debug;

use crate::error::{ArbError, ArbResult};
use crate::types::{Profitability, Route};
use crate::venue::{bounded, SettlementVenue};

/// Principal plus the required margin: `size * (min_bps + 10000) / 10000`.
/// `None` when the target does not fit in a `U256`.
pub fn profit_target(trade_size: U256, min_basis_points: u32) -> Option<U256> {
    let multiplier = U256::from(min_basis_points) + U256::from(10_000);
    let target = trade_size.full_mul(multiplier) / U512::from(10_000);
    U256::try_from(target).ok()
}

pub struct Estimator<V> {
    venue: Arc<V>,
    min_basis_points: u32,
    call_timeout: Duration,
}

impl<V: SettlementVenue> Estimator<V> {
    pub fn new(venue: Arc<V>, min_basis_points: u32, call_timeout: Duration) -> Self {
        Self {
            venue,
            min_basis_points,
            call_timeout,
        }
    }

    /// Quote `route` at `trade_size` and compare to the profit target.
    ///
    /// Errors (call failure, revert, timeout) mean "not evaluated" and are
    /// returned to the caller; they are never folded into an unprofitable verdict.
    pub async fn estimate(&self, route: &Route, trade_size: U256) -> ArbResult<Profitability> {
        let amount_back = bounded("quote", self.call_timeout, self.venue.quote(route, trade_size)).await?;
        let target = profit_target(trade_size, self.min_basis_points).ok_or(ArbError::Overflow {
            operation: "profit target",
            value: trade_size,
        })?;
        let profitability = Profitability::from_quote(amount_back, target);

        debug!(
            route = %route.id(),
            trade_size = %trade_size,
            amount_back = %amount_back,
            profit_target = %target,
            margin = %profitability.margin,
            "Route quoted"
        );

        Ok(profitability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Settlement;
    use async_trait::async_trait;

    /// Venue returning a fixed quote, or hanging when `amount_back` is `None`
    struct FixedQuote {
        amount_back: Option<u64>,
    }

    #[async_trait]
    impl SettlementVenue for FixedQuote {
        async fn quote(&self, _route: &Route, _size: U256) -> ArbResult<U256> {
            match self.amount_back {
                Some(amount) => Ok(U256::from(amount)),
                None => std::future::pending().await,
            }
        }

        async fn trade(&self, _route: &Route, _size: U256) -> ArbResult<Settlement> {
            unreachable!("estimator never trades")
        }

        async fn balance_of(&self, _asset: Address) -> ArbResult<U256> {
            unreachable!("estimator never reads balances")
        }
    }

    fn route() -> Route {
        Route::new(
            Address::from_low_u64_be(1),
            Address::from_low_u64_be(2),
            Address::from_low_u64_be(3),
            Address::from_low_u64_be(4),
        )
    }

    fn estimator(amount_back: Option<u64>) -> Estimator<FixedQuote> {
        Estimator::new(Arc::new(FixedQuote { amount_back }), 50, Duration::from_secs(5))
    }

    #[test]
    fn test_profit_target() {
        assert_eq!(profit_target(U256::from(1000), 50), Some(U256::from(1005)));
        assert_eq!(profit_target(U256::from(1000), 0), Some(U256::from(1000)));
        // integer division rounds the target down
        assert_eq!(profit_target(U256::from(999), 50), Some(U256::from(1003)));
    }

    #[test]
    fn test_profit_target_at_u256_limits() {
        // the intermediate product overflows U256 but the target still fits
        let size = U256::MAX / 5000;
        let expected = size + size * 50 / 10_000;
        assert_eq!(profit_target(size, 50), Some(expected));

        assert_eq!(profit_target(U256::MAX, 0), Some(U256::MAX));
        assert_eq!(profit_target(U256::MAX, 50), None);
    }

    #[test]
    fn test_margin_sign_survives_huge_quotes() {
        let huge = Profitability::from_quote(U256::MAX, U256::from(1005));
        assert!(huge.is_profitable());
        assert_eq!(huge.margin, I256::MAX);

        let short = Profitability::from_quote(U256::zero(), U256::MAX);
        assert!(!short.is_profitable());
        assert_eq!(short.margin, I256::MIN);

        let half = U256::one() << 255;
        assert!(Profitability::from_quote(half, U256::from(1)).is_profitable());
        assert_eq!(Profitability::from_quote(half, half).margin, I256::zero());
    }

    #[tokio::test]
    async fn test_oversized_trade_is_an_error() {
        let err = estimator(Some(1006)).estimate(&route(), U256::MAX).await.unwrap_err();
        assert!(matches!(err, ArbError::Overflow { operation: "profit target", .. }));
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let route = route();
        let size = U256::from(1000);

        let above = estimator(Some(1006)).estimate(&route, size).await.unwrap();
        assert!(above.is_profitable());
        assert_eq!(above.margin, I256::from(1));

        let equal = estimator(Some(1005)).estimate(&route, size).await.unwrap();
        assert!(!equal.is_profitable());
        assert_eq!(equal.margin, I256::zero());

        let below = estimator(Some(900)).estimate(&route, size).await.unwrap();
        assert!(!below.is_profitable());
        assert_eq!(below.margin, I256::from(-105));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_quote_times_out() {
        let err = estimator(None)
            .estimate(&route(), U256::from(1000))
            .await
            .unwrap_err();
        assert!(matches!(err, ArbError::Timeout { operation: "quote", .. }));
    }
}
