/// Route store: where candidate routes come from
///
/// Either a fixed configured list, handed out round-robin through one shared
/// atomic cursor, or (discovery mode) an endless supply of random router and
/// asset combinations. Profitable discovered routes are appended to a
/// discovery log, one JSON address array per line.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ethers::prelude::*;
use rand::Rng;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ArbResult, ConfigError};
use crate::types::{Asset, Config, Route, Router};

/// Candidate source of routes
enum RouteSource {
    /// Preconfigured list consumed round-robin
    Fixed { routes: Vec<Route>, cursor: AtomicUsize },
    /// Random combinations drawn from the configured pools
    Discovery(DiscoveryPools),
}

/// Router and asset pools for discovery mode
struct DiscoveryPools {
    routers: Vec<Address>,
    /// Each source asset paired with the destinations that differ from it
    pairs: Vec<(Address, Vec<Address>)>,
}

impl DiscoveryPools {
    fn new(routers: &[Router], sources: &[Asset], destinations: &[Asset]) -> Result<Self, ConfigError> {
        if routers.is_empty() {
            return Err(ConfigError::NoRouters);
        }

        let pairs: Vec<(Address, Vec<Address>)> = sources
            .iter()
            .map(|src| {
                let dests = destinations
                    .iter()
                    .map(|dst| dst.address)
                    .filter(|dst| *dst != src.address)
                    .collect::<Vec<_>>();
                (src.address, dests)
            })
            .filter(|(_, dests)| !dests.is_empty())
            .collect();

        if pairs.is_empty() {
            return Err(ConfigError::NoDistinctPair);
        }

        Ok(Self {
            routers: routers.iter().map(|r| r.address).collect(),
            pairs,
        })
    }

    /// Routers are drawn independently and may repeat; assets never do
    fn draw(&self) -> Route {
        let mut rng = rand::thread_rng();
        let router_a = self.routers[rng.gen_range(0..self.routers.len())];
        let router_b = self.routers[rng.gen_range(0..self.routers.len())];
        let (token_source, dests) = &self.pairs[rng.gen_range(0..self.pairs.len())];
        let token_dest = dests[rng.gen_range(0..dests.len())];
        Route::new(router_a, router_b, *token_source, token_dest)
    }
}

pub struct RouteStore {
    source: RouteSource,
    discovery_log: DiscoveryLog,
}

impl RouteStore {
    /// Round-robin over a fixed, non-empty list of routes
    pub fn fixed(routes: Vec<Route>, discovery_log: PathBuf) -> Result<Self, ConfigError> {
        if routes.is_empty() {
            return Err(ConfigError::NoRoutes);
        }
        Ok(Self {
            source: RouteSource::Fixed {
                routes,
                cursor: AtomicUsize::new(0),
            },
            discovery_log: DiscoveryLog::new(discovery_log),
        })
    }

    /// Random routes from router and asset pools
    pub fn discovery(
        routers: &[Router],
        sources: &[Asset],
        destinations: &[Asset],
        discovery_log: PathBuf,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            source: RouteSource::Discovery(DiscoveryPools::new(routers, sources, destinations)?),
            discovery_log: DiscoveryLog::new(discovery_log),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        if config.discovery_mode() {
            let destinations = if config.tokens.is_empty() {
                &config.base_assets
            } else {
                &config.tokens
            };
            Self::discovery(
                &config.routers,
                &config.base_assets,
                destinations,
                config.discovery_log.clone(),
            )
        } else {
            Self::fixed(config.routes.clone(), config.discovery_log.clone())
        }
    }

    pub fn is_discovery(&self) -> bool {
        matches!(self.source, RouteSource::Discovery(_))
    }

    /// Next route to evaluate. Never returns a self-pair.
    ///
    /// In fixed mode every call claims its own slot: the cursor is advanced
    /// and wrapped in one atomic step, so concurrent workers never share one.
    pub fn select_route(&self) -> Route {
        match &self.source {
            RouteSource::Fixed { routes, cursor } => {
                let slot = cursor
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                        Some((i + 1) % routes.len())
                    })
                    .unwrap_or_else(|i| i);
                routes[slot]
            }
            RouteSource::Discovery(pools) => pools.draw(),
        }
    }

    /// Record a profitable route found in discovery mode; no-op for fixed lists
    pub async fn record_discovery(&self, route: &Route) -> ArbResult<()> {
        if !self.is_discovery() {
            return Ok(());
        }
        self.discovery_log.append(route).await?;
        info!(route = %route.id(), path = ?self.discovery_log.path(), "Logged discovered route");
        Ok(())
    }

    pub fn discovery_log(&self) -> &DiscoveryLog {
        &self.discovery_log
    }
}

/// Append-only text file of discovered routes
pub struct DiscoveryLog {
    path: PathBuf,
    /// Keeps concurrent appends from interleaving within a line
    write_lock: Mutex<()>,
}

impl DiscoveryLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, route: &Route) -> std::io::Result<()> {
        let mut line = format_discovery_line(route);
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

/// `["0xrouter1","0xrouter2","0xtoken1","0xtoken2"]`
pub fn format_discovery_line(route: &Route) -> String {
    let [r1, r2, t1, t2] = route.id().0;
    format!(r#"["{r1:?}","{r2:?}","{t1:?}","{t2:?}"]"#)
}

/// Parse one discovery-log line back into a route.
///
/// A trailing comma is tolerated so lines can be pasted between the
/// brackets of a network file's `routes` array and read back unchanged.
pub fn parse_discovery_line(line: &str) -> Result<Route, serde_json::Error> {
    let line = line.trim();
    let line = line.strip_suffix(',').unwrap_or(line);
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn route(n: u64) -> Route {
        Route::new(addr(n), addr(n + 100), addr(n + 200), addr(n + 300))
    }

    fn asset(sym: &str, n: u64) -> Asset {
        Asset {
            symbol: sym.to_string(),
            address: addr(n),
        }
    }

    fn router(n: u64) -> Router {
        Router {
            name: format!("dex{n}"),
            address: addr(n),
        }
    }

    #[test]
    fn test_round_robin_covers_list_in_order() {
        let routes = vec![route(1), route(2), route(3)];
        let store = RouteStore::fixed(routes.clone(), PathBuf::from("unused")).unwrap();

        let picked: Vec<Route> = (0..routes.len()).map(|_| store.select_route()).collect();
        assert_eq!(picked, routes);

        // L + 1-th call wraps around
        assert_eq!(store.select_route(), routes[0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_selection_claims_distinct_slots() {
        let routes: Vec<Route> = (1..=8).map(route).collect();
        let store = Arc::new(RouteStore::fixed(routes.clone(), PathBuf::from("unused")).unwrap());

        let mut handles = Vec::new();
        for _ in 0..routes.len() {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.select_route() }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            seen.insert(handle.await.unwrap());
        }
        assert_eq!(seen.len(), routes.len());
    }

    #[test]
    fn test_empty_fixed_list_rejected() {
        let result = RouteStore::fixed(vec![], PathBuf::from("unused"));
        assert!(matches!(result, Err(ConfigError::NoRoutes)));
    }

    #[test]
    fn test_discovery_never_yields_self_pair() {
        let routers = vec![router(1), router(2)];
        let sources = vec![asset("WETH", 10), asset("USDC", 11)];
        // destination pool overlaps the sources
        let dests = vec![asset("WETH", 10), asset("USDC", 11), asset("NEAR", 12)];
        let store = RouteStore::discovery(&routers, &sources, &dests, PathBuf::from("unused")).unwrap();
        assert!(store.is_discovery());

        for _ in 0..500 {
            let r = store.select_route();
            assert!(!r.is_self_pair());
            assert!(routers.iter().any(|x| x.address == r.router_a));
            assert!(routers.iter().any(|x| x.address == r.router_b));
        }
    }

    #[test]
    fn test_discovery_rejects_pools_without_distinct_pair() {
        let result = RouteStore::discovery(
            &[router(1)],
            &[asset("WETH", 10)],
            &[asset("WETH", 10)],
            PathBuf::from("unused"),
        );
        assert!(matches!(result, Err(ConfigError::NoDistinctPair)));
    }

    #[test]
    fn test_discovery_line_round_trips() {
        let r = Route::new(
            "0x2cb45edb4517d5947afde3beabf95a582506858b".parse().unwrap(),
            "0xa3a1ef5ae6561572023363862e238afa84c72ef5".parse().unwrap(),
            "0xc9bdeed33cd01541e1eed10f90519d2c06fe3feb".parse().unwrap(),
            "0xb12bfca5a55806aaf64e99521918a4bf0fc40802".parse().unwrap(),
        );

        let line = format_discovery_line(&r);
        assert_eq!(
            line,
            r#"["0x2cb45edb4517d5947afde3beabf95a582506858b","0xa3a1ef5ae6561572023363862e238afa84c72ef5","0xc9bdeed33cd01541e1eed10f90519d2c06fe3feb","0xb12bfca5a55806aaf64e99521918a4bf0fc40802"]"#
        );
        // every field is quoted on both sides
        assert_eq!(line.matches('"').count(), 8);
        assert_eq!(parse_discovery_line(&line).unwrap(), r);
        assert_eq!(parse_discovery_line(&format!("{line},\n")).unwrap(), r);
    }

    #[test]
    fn test_unterminated_line_is_rejected() {
        let bad = r#"["0x2cb45edb4517d5947afde3beabf95a582506858b","0xa3a1ef5ae6561572023363862e238afa84c72ef5","0xc9bdeed33cd01541e1eed10f90519d2c06fe3feb","0xb12bfca5a55806aaf64e99521918a4bf0fc40802]"#;
        assert!(parse_discovery_line(bad).is_err());
    }

    #[tokio::test]
    async fn test_record_discovery_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("aurora_RouteLog.txt");
        let store = RouteStore::discovery(
            &[router(1), router(2)],
            &[asset("WETH", 10)],
            &[asset("USDC", 11)],
            path.clone(),
        )
        .unwrap();

        let first = store.select_route();
        let second = route(7);
        store.record_discovery(&first).await.unwrap();
        store.record_discovery(&second).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Route> = contents
            .lines()
            .map(|l| parse_discovery_line(l).unwrap())
            .collect();
        assert_eq!(parsed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_fixed_store_does_not_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RouteLog.txt");
        let store = RouteStore::fixed(vec![route(1)], path.clone()).unwrap();

        store.record_discovery(&route(1)).await.unwrap();
        assert!(!path.exists());
    }
}
