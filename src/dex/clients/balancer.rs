// src/dex/clients/balancer.rs
//! Balancer V2 weighted pools. A pool may hold more than two tokens; any pool
//! holding both symbols of the pair is a candidate, priced from balances and
//! weights: `(balance_quote / weight_quote) / (balance_base / weight_base)`.

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::dex::pool::{required_array, required_f64, select_best_pool, value_as_f64, PoolCandidate};
use crate::dex::quote::VenueAdapter;
use crate::error::Result;
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

const BULK_POOLS_QUERY: &str = r#"{
  pools(first: 100, orderBy: totalLiquidity, orderDirection: desc, where: { totalLiquidity_gt: "0" }) {
    id
    totalLiquidity
    tokens { symbol address weight balance }
  }
}"#;

#[derive(Default)]
pub struct BalancerAdapter;

impl BalancerAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Reduces each pool to a two-token candidate for `pair`. Pools missing
    /// either symbol are dropped; stable pools without weights are treated as
    /// equally weighted. Only the matching pool's balances and liquidity are
    /// read, and a malformed matching pool is skipped.
    pub fn parse_candidates(data: &Value, pair: &TokenPair) -> Result<Vec<PoolCandidate>> {
        let mut candidates = Vec::new();
        for pool in required_array(data, "pools")? {
            let tokens = match pool.get("tokens").and_then(Value::as_array) {
                Some(tokens) => tokens,
                None => {
                    debug!("balancer: skipping pool without tokens: {}", pool);
                    continue;
                }
            };
            let find = |symbol: &str| {
                tokens.iter().find(|t| {
                    t.get("symbol")
                        .and_then(Value::as_str)
                        .map_or(false, |s| s.eq_ignore_ascii_case(symbol))
                })
            };
            let (base, quote) = match (find(pair.base.as_str()), find(pair.quote.as_str())) {
                (Some(b), Some(q)) => (b, q),
                _ => continue,
            };

            match Self::weighted_candidate(pool, base, quote, pair) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => debug!("balancer: skipping malformed {} pool: {}", pair, e),
            }
        }
        Ok(candidates)
    }

    fn weighted_candidate(pool: &Value, base: &Value, quote: &Value, pair: &TokenPair) -> Result<PoolCandidate> {
        let base_weight = base.get("weight").and_then(value_as_f64).unwrap_or(1.0);
        let quote_weight = quote.get("weight").and_then(value_as_f64).unwrap_or(1.0);
        let quote_per_base = (required_f64(quote, "balance")? / quote_weight)
            / (required_f64(base, "balance")? / base_weight);
        Ok(PoolCandidate {
            id: pool.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
            token0: pair.base.clone(),
            token1: pair.quote.clone(),
            token0_price: 1.0 / quote_per_base,
            token1_price: quote_per_base,
            liquidity: required_f64(pool, "totalLiquidity")?,
        })
    }
}

#[async_trait]
impl VenueAdapter for BalancerAdapter {
    fn venue_id(&self) -> &str {
        "balancer"
    }

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        let data = client
            .execute(&venue.endpoint, BULK_POOLS_QUERY, None)
            .await?
            .into_data()?;
        let candidates = Self::parse_candidates(&data, pair)?;
        debug!("balancer: {} pools hold both {} and {}", candidates.len(), pair.base, pair.quote);
        Ok(select_best_pool(self.venue_id(), pair, &candidates, now_unix()))
    }
}
