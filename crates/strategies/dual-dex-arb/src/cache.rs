/// Profitability cache keyed by route identity
///
/// Entries never expire unless a TTL is configured. Concurrent misses on the
/// same route share one estimation: the first caller runs it and the rest
/// wait for its result. A failed estimation leaves the entry empty, so the
/// next caller estimates again instead of reading a false verdict.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::error::{ArbError, ArbResult};
use crate::types::{Profitability, Route, RouteId};

#[derive(Debug, Clone, Copy)]
struct CachedVerdict {
    profitability: Profitability,
    estimated_at: Instant,
}

type Slot = Arc<OnceCell<CachedVerdict>>;

#[derive(Debug, Default)]
pub struct ProfitabilityCache {
    entries: DashMap<RouteId, Slot>,
    ttl: Option<Duration>,
}

impl ProfitabilityCache {
    /// Cache whose entries live until invalidated
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose entries are re-estimated once older than `ttl`
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached verdict for `route`, estimating it on a miss.
    ///
    /// `estimate` runs at most once per route between invalidations, however
    /// many workers miss at the same time. Its error is returned as-is and
    /// nothing is stored.
    pub async fn get_or_estimate<F, Fut>(&self, route: &Route, estimate: F) -> ArbResult<Profitability>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ArbResult<Profitability>>,
    {
        let slot = self.slot(route.id());
        let verdict = slot
            .get_or_try_init(|| async move {
                let profitability = estimate().await?;
                Ok::<_, ArbError>(CachedVerdict {
                    profitability,
                    estimated_at: Instant::now(),
                })
            })
            .await?;
        Ok(verdict.profitability)
    }

    /// Cached verdict without estimating
    pub fn get(&self, route: &Route) -> Option<Profitability> {
        let slot = self.entries.get(&route.id())?.clone();
        let verdict = slot.get()?;
        (!self.is_expired(verdict)).then_some(verdict.profitability)
    }

    /// Drop the verdict for `route` so the next lookup estimates again
    pub fn invalidate(&self, route: &Route) {
        self.entries.remove(&route.id());
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot for `id`, replacing it first if its verdict has expired
    fn slot(&self, id: RouteId) -> Slot {
        let slot = self.entries.entry(id).or_default().clone();
        match slot.get() {
            Some(verdict) if self.is_expired(verdict) => {
                self.entries.remove_if(&id, |_, current| Arc::ptr_eq(current, &slot));
                self.entries.entry(id).or_default().clone()
            }
            _ => slot,
        }
    }

    fn is_expired(&self, verdict: &CachedVerdict) -> bool {
        match self.ttl {
            Some(ttl) => verdict.estimated_at.elapsed() >= ttl,
            None => false,
        }
    }
}
