use crate::error::ArbError;
use crate::utils::TokenPair;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use url::Url;

const GRAPH_GATEWAY_URL: &str = "https://gateway.thegraph.com/api";

/// Static description of one price source.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueConfig {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub fee_pct: f64,
}

impl VenueConfig {
    pub fn new(id: &str, name: &str, endpoint: &str, fee_pct: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            fee_pct,
        }
    }
}

/// Built-in venue table: (id, display name, hosted subgraph / REST endpoint, subgraph id, fee %).
const DEFAULT_VENUES: &[(&str, &str, &str, Option<&str>, f64)] = &[
    (
        "uniswap_v3",
        "Uniswap V3",
        "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3-polygon",
        Some("5zvR82QoaXYFyDEKLZ9t6v9adgnptxYpKpSbxtgVENFV"),
        0.3,
    ),
    (
        "quickswap",
        "QuickSwap",
        "https://api.thegraph.com/subgraphs/name/sameepsi/quickswap-v3",
        Some("FqsRcH1XqSjqVx9GRTvEJe959aCbKrcyGgDWBrUkG24g"),
        0.3,
    ),
    (
        "sushiswap",
        "SushiSwap",
        "https://api.thegraph.com/subgraphs/name/sushiswap/exchange-polygon",
        Some("CKaCne3uUUEqT7Ei9jjZbQqTLntEno9LnFa4JnsqqBma"),
        0.3,
    ),
    (
        "balancer",
        "Balancer V2",
        "https://api.thegraph.com/subgraphs/name/balancer-labs/balancer-polygon-v2",
        Some("H9oPAbXnobBRq1cB3HDmbZ1E8MWQyJYQjT1QDJMrdbNp"),
        0.3,
    ),
    ("binance", "Binance", "https://api.binance.com/api/v3/ticker/price", None, 0.1),
    ("coinbase", "Coinbase", "https://api.coinbase.com/v2/prices", None, 0.5),
];

#[derive(Debug, Clone)]
pub struct Config {
    pub price_update_interval_secs: u64,
    pub error_retry_delay_secs: u64,
    pub arbitrage_threshold_pct: f64,
    pub slippage_tolerance_pct: f64,
    pub notification_cooldown_secs: i64,
    pub token_pairs: Vec<TokenPair>,
    pub venues: BTreeMap<String, VenueConfig>,
    pub redis_url: String,
    pub cache_ttl_secs: i64,
    pub database_path: String,
    pub query_timeout_secs: u64,
    pub query_max_retries: u32,
    pub query_retry_delay_ms: u64,
    pub max_concurrent_requests: usize,
    pub slack_webhook_url: Option<String>,
    pub log_level: String,
    pub log_file: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses `k<sep>v,k<sep>v`, skipping malformed entries.
fn parse_kv_list(raw: &str, sep: char) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|part| {
            let (key, value) = part.split_once(sep)?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, ArbError> {
        let token_pairs = env::var("TOKEN_PAIRS")
            .unwrap_or_else(|_| "MATIC/USDT,USDC/DAI,WETH/USDT,WBTC/USDT".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<TokenPair>, ArbError>>()?;

        let redis_url = non_empty_env("REDIS_URL").unwrap_or_else(|| {
            let host = env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port: u16 = env_or("REDIS_PORT", 6379);
            let db: u32 = env_or("REDIS_DB", 0);
            match non_empty_env("REDIS_PASSWORD") {
                Some(password) => format!("redis://:{}@{}:{}/{}", password, host, port, db),
                None => format!("redis://{}:{}/{}", host, port, db),
            }
        });

        Ok(Config {
            price_update_interval_secs: env_or("PRICE_UPDATE_INTERVAL", 5),
            error_retry_delay_secs: env_or("ERROR_RETRY_DELAY", 5),
            arbitrage_threshold_pct: env_or("ARBITRAGE_THRESHOLD", 0.5),
            slippage_tolerance_pct: env_or("SLIPPAGE_TOLERANCE", 0.3),
            notification_cooldown_secs: env_or("NOTIFICATION_COOLDOWN", 300),
            token_pairs,
            venues: Self::venues_from_env(),
            redis_url,
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 3600),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/arbitrage.db".to_string()),
            query_timeout_secs: env_or("QUERY_TIMEOUT_SECS", 30),
            query_max_retries: env_or("QUERY_MAX_RETRIES", 3),
            query_retry_delay_ms: env_or("QUERY_RETRY_DELAY_MS", 2000),
            max_concurrent_requests: env_or("MAX_CONCURRENT_REQUESTS", 16),
            slack_webhook_url: non_empty_env("SLACK_WEBHOOK_URL"),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: match env::var("LOG_FILE") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => Some("logs/app.log".to_string()),
            },
        })
    }

    /// Default venue table, narrowed by `ENABLED_VENUES` and patched by
    /// `VENUE_ENDPOINTS` (`id=url,...`) and `VENUE_FEES` (`id:fee,...`).
    fn venues_from_env() -> BTreeMap<String, VenueConfig> {
        let graph_api_key = non_empty_env("GRAPH_API_KEY");
        let mut venues: BTreeMap<String, VenueConfig> = DEFAULT_VENUES
            .iter()
            .map(|(id, name, hosted, subgraph_id, fee)| {
                let endpoint = match (&graph_api_key, subgraph_id) {
                    (Some(key), Some(subgraph)) => {
                        format!("{}/{}/subgraphs/id/{}", GRAPH_GATEWAY_URL, key, subgraph)
                    }
                    _ => hosted.to_string(),
                };
                (id.to_string(), VenueConfig::new(id, name, &endpoint, *fee))
            })
            .collect();

        if let Some(enabled) = non_empty_env("ENABLED_VENUES") {
            let enabled: Vec<String> = enabled.split(',').map(|s| s.trim().to_string()).collect();
            for id in enabled.iter().filter(|id| !id.is_empty()) {
                if !venues.contains_key(id) {
                    log::warn!("ENABLED_VENUES lists unknown venue '{}', ignoring it", id);
                }
            }
            venues.retain(|id, _| enabled.contains(id));
        }

        if let Ok(raw) = env::var("VENUE_ENDPOINTS") {
            for (id, url) in parse_kv_list(&raw, '=') {
                if let Some(venue) = venues.get_mut(&id) {
                    venue.endpoint = url;
                }
            }
        }
        if let Ok(raw) = env::var("VENUE_FEES") {
            for (id, fee) in parse_kv_list(&raw, ':') {
                if let (Some(venue), Ok(fee)) = (venues.get_mut(&id), fee.parse::<f64>()) {
                    venue.fee_pct = fee;
                }
            }
        }
        venues
    }

    pub fn validate(&self) -> Result<(), ArbError> {
        if self.price_update_interval_secs == 0 {
            return Err(ArbError::ConfigError("PRICE_UPDATE_INTERVAL must be positive".into()));
        }
        if self.arbitrage_threshold_pct < 0.0 || self.slippage_tolerance_pct < 0.0 {
            return Err(ArbError::ConfigError(
                "ARBITRAGE_THRESHOLD and SLIPPAGE_TOLERANCE must not be negative".into(),
            ));
        }
        if self.notification_cooldown_secs < 0 || self.cache_ttl_secs <= 0 {
            return Err(ArbError::ConfigError(
                "NOTIFICATION_COOLDOWN must not be negative and CACHE_TTL_SECS must be positive".into(),
            ));
        }
        if self.token_pairs.is_empty() {
            return Err(ArbError::ConfigError("TOKEN_PAIRS is empty".into()));
        }
        if self.venues.is_empty() {
            return Err(ArbError::ConfigError("No venues enabled".into()));
        }
        for venue in self.venues.values() {
            Url::parse(&venue.endpoint).map_err(|e| {
                ArbError::ConfigError(format!(
                    "Venue '{}' has invalid endpoint '{}': {}",
                    venue.id, venue.endpoint, e
                ))
            })?;
            if venue.fee_pct < 0.0 {
                return Err(ArbError::ConfigError(format!("Venue '{}' has a negative fee", venue.id)));
            }
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        log::info!(
            "Configuration loaded: interval={}s threshold={}% slippage={}% cooldown={}s pairs=[{}]",
            self.price_update_interval_secs,
            self.arbitrage_threshold_pct,
            self.slippage_tolerance_pct,
            self.notification_cooldown_secs,
            self.token_pairs.iter().map(TokenPair::key).collect::<Vec<_>>().join(", ")
        );
        for venue in self.venues.values() {
            log::info!("  venue {} ({}) fee={}%", venue.id, venue.name, venue.fee_pct);
        }
        log::info!(
            "  durable log at {}, query timeout {}s with {} retries, notifications {}",
            self.database_path,
            self.query_timeout_secs,
            self.query_max_retries,
            if self.slack_webhook_url.is_some() { "enabled" } else { "log-only" }
        );
    }

    pub fn price_update_interval(&self) -> Duration {
        Duration::from_secs(self.price_update_interval_secs)
    }

    pub fn error_retry_delay(&self) -> Duration {
        Duration::from_secs(self.error_retry_delay_secs)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            price_update_interval_secs: 5,
            error_retry_delay_secs: 5,
            arbitrage_threshold_pct: 0.5,
            slippage_tolerance_pct: 0.3,
            notification_cooldown_secs: 300,
            token_pairs: vec![
                TokenPair::new("MATIC", "USDT"),
                TokenPair::new("USDC", "DAI"),
                TokenPair::new("WETH", "USDT"),
                TokenPair::new("WBTC", "USDT"),
            ],
            venues: DEFAULT_VENUES
                .iter()
                .map(|(id, name, hosted, _, fee)| (id.to_string(), VenueConfig::new(id, name, hosted, *fee)))
                .collect(),
            redis_url: "redis://localhost:6379/0".to_string(),
            cache_ttl_secs: 3600,
            database_path: "./data/arbitrage.db".to_string(),
            query_timeout_secs: 30,
            query_max_retries: 3,
            query_retry_delay_ms: 2000,
            max_concurrent_requests: 16,
            slack_webhook_url: None,
            log_level: "info".to_string(),
            log_file: Some("logs/app.log".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.venues.len(), 6);
        assert_eq!(config.venues["binance"].fee_pct, 0.1);
        assert!(!config.venues.contains_key("unknown"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        if let Some(v) = config.venues.get_mut("sushiswap") {
            v.endpoint = "not a url".to_string();
        }
        assert!(matches!(config.validate(), Err(ArbError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_empty_pairs() {
        let config = Config {
            token_pairs: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_kv_list_skips_malformed_entries() {
        let parsed = parse_kv_list("binance:0.075, bad, coinbase : 0.4,:1", ':');
        assert_eq!(
            parsed,
            vec![
                ("binance".to_string(), "0.075".to_string()),
                ("coinbase".to_string(), "0.4".to_string()),
            ]
        );
    }

    #[test]
    fn test_log_level_fallback() {
        let config = Config {
            log_level: "chatty".to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }
}
