/// Network file loading and startup validation
///
/// A network file lives at `<config_dir>/<network>.json`:
///
/// ```text
/// {
///   "arbContract": "0x...",
///   "minBasisPointsPerTrade": 50,
///   "baseAssets": [{ "sym": "WETH", "address": "0x..." }],
///   "tokens": [{ "sym": "USDC", "address": "0x..." }],
///   "routers": [{ "dex": "trisolaris", "address": "0x..." }],
///   "routes": [["0xrouter1", "0xrouter2", "0xtoken1", "0xtoken2"]]
/// }
/// ```

use std::path::{Path, PathBuf};

use ethers::prelude::*;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{Asset, Config, Route, Router, Timing};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub arb_contract: Address,
    pub min_basis_points_per_trade: u32,
    pub base_assets: Vec<Asset>,
    #[serde(default)]
    pub tokens: Vec<Asset>,
    #[serde(default)]
    pub routers: Vec<Router>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl NetworkConfig {
    pub fn path(config_dir: &Path, network: &str) -> PathBuf {
        config_dir.join(format!("{network}.json"))
    }

    /// Read and parse `<config_dir>/<network>.json`
    pub fn load(config_dir: &Path, network: &str) -> Result<Self, ConfigError> {
        let path = Self::path(config_dir, network);
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Check everything a worker relies on before any worker starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_assets.is_empty() {
            return Err(ConfigError::NoBaseAssets);
        }

        if let Some((index, route)) = self.routes.iter().enumerate().find(|(_, r)| r.is_self_pair()) {
            return Err(ConfigError::SelfPairRoute {
                index,
                asset: route.token_source,
            });
        }

        if self.routes.is_empty() {
            if self.routers.is_empty() {
                return Err(ConfigError::NoRouters);
            }
            let dest_pool = self.destination_pool();
            let has_pair = self
                .base_assets
                .iter()
                .any(|src| dest_pool.iter().any(|dst| dst.address != src.address));
            if !has_pair {
                return Err(ConfigError::NoDistinctPair);
            }
        }

        Ok(())
    }

    /// Destination assets for discovered routes
    pub fn destination_pool(&self) -> &[Asset] {
        if self.tokens.is_empty() {
            &self.base_assets
        } else {
            &self.tokens
        }
    }

    /// Validate and combine with process options into the runtime config
    pub fn into_config(
        self,
        network: &str,
        data_dir: &Path,
        workers: usize,
        timing: Timing,
    ) -> Result<Config, ConfigError> {
        self.validate()?;
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        Ok(Config {
            network: network.to_string(),
            settlement_contract: self.arb_contract,
            base_assets: self.base_assets,
            tokens: self.tokens,
            routers: self.routers,
            routes: self.routes,
            min_basis_points_per_trade: self.min_basis_points_per_trade,
            workers,
            timing,
            discovery_log: data_dir.join(format!("{network}_RouteLog.txt")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WETH: &str = "0xc9bdeed33cd01541e1eed10f90519d2c06fe3feb";
    const USDC: &str = "0xb12bfca5a55806aaf64e99521918a4bf0fc40802";
    const ROUTER_1: &str = "0x2cb45edb4517d5947afde3beabf95a582506858b";
    const ROUTER_2: &str = "0xa3a1ef5ae6561572023363862e238afa84c72ef5";

    fn network_json(routes: &str) -> String {
        format!(
            r#"{{
                "arbContract": "0x1111111111111111111111111111111111111111",
                "minBasisPointsPerTrade": 50,
                "baseAssets": [{{ "sym": "WETH", "address": "{WETH}" }}],
                "tokens": [{{ "sym": "USDC", "address": "{USDC}" }}],
                "routers": [
                    {{ "dex": "trisolaris", "address": "{ROUTER_1}" }},
                    {{ "dex": "wannaswap", "address": "{ROUTER_2}" }}
                ],
                "routes": {routes}
            }}"#
        )
    }

    fn write_network(dir: &Path, network: &str, body: &str) {
        let mut file = std::fs::File::create(NetworkConfig::path(dir, network)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_network_file() {
        let dir = tempfile::tempdir().unwrap();
        let routes = format!(r#"[["{ROUTER_1}", "{ROUTER_2}", "{WETH}", "{USDC}"]]"#);
        write_network(dir.path(), "aurora", &network_json(&routes));

        let network = NetworkConfig::load(dir.path(), "aurora").unwrap();
        assert_eq!(network.min_basis_points_per_trade, 50);
        assert_eq!(network.base_assets[0].symbol, "WETH");
        assert_eq!(network.routers[1].name, "wannaswap");
        assert_eq!(network.routes.len(), 1);
        assert_eq!(network.routes[0].token_dest, USDC.parse::<Address>().unwrap());

        let config = network
            .into_config("aurora", Path::new("data"), 4, Timing::default())
            .unwrap();
        assert!(!config.discovery_mode());
        assert_eq!(config.discovery_log, Path::new("data").join("aurora_RouteLog.txt"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkConfig::load(dir.path(), "nowhere").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_address_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let routes = format!(r#"[["{ROUTER_1}", "0xnothex", "{WETH}", "{USDC}"]]"#);
        write_network(dir.path(), "aurora", &network_json(&routes));

        let err = NetworkConfig::load(dir.path(), "aurora").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_self_pair_route_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let routes = format!(r#"[["{ROUTER_1}", "{ROUTER_2}", "{WETH}", "{WETH}"]]"#);
        write_network(dir.path(), "aurora", &network_json(&routes));

        let network = NetworkConfig::load(dir.path(), "aurora").unwrap();
        let err = network.validate().unwrap_err();
        assert!(matches!(err, ConfigError::SelfPairRoute { index: 0, .. }));
    }

    #[test]
    fn test_discovery_mode_needs_distinct_pair() {
        let dir = tempfile::tempdir().unwrap();
        write_network(dir.path(), "aurora", &network_json("[]"));
        let mut network = NetworkConfig::load(dir.path(), "aurora").unwrap();
        assert!(network.validate().is_ok());

        // only WETH on both sides
        network.tokens = network.base_assets.clone();
        assert!(matches!(network.validate(), Err(ConfigError::NoDistinctPair)));

        network.routers.clear();
        assert!(matches!(network.validate(), Err(ConfigError::NoRouters)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_network(dir.path(), "aurora", &network_json("[]"));
        let network = NetworkConfig::load(dir.path(), "aurora").unwrap();
        let err = network
            .into_config("aurora", Path::new("data"), 0, Timing::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoWorkers));
    }

    #[test]
    fn test_shipped_network_file_is_valid() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../config");
        let network = NetworkConfig::load(&config_dir, "aurora").unwrap();
        network.validate().unwrap();
        assert!(network.routes.is_empty());
        assert_eq!(network.destination_pool().len(), network.tokens.len());
    }
}
