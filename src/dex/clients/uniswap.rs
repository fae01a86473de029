// src/dex/clients/uniswap.rs
//! Concentrated-liquidity subgraphs (Uniswap V3, QuickSwap V3). Both expose the
//! same `pools` schema with server-side symbol filtering; they differ only in
//! which field measures pool depth.

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::dex::pool::{candidate_from_subgraph, select_best_pool, PoolCandidate};
use crate::dex::quote::VenueAdapter;
use crate::error::{ArbError, Result};
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

const POOLS_PER_ORIENTATION: u32 = 5;

pub struct SubgraphPoolAdapter {
    venue_id: String,
    liquidity_field: &'static str,
}

impl SubgraphPoolAdapter {
    pub fn uniswap_v3() -> Self {
        Self {
            venue_id: "uniswap_v3".to_string(),
            liquidity_field: "liquidity",
        }
    }

    pub fn quickswap() -> Self {
        Self {
            venue_id: "quickswap".to_string(),
            liquidity_field: "totalValueLockedUSD",
        }
    }

    /// The subgraph orders token0/token1 by address, so both orientations are
    /// requested under the aliases `forward` and `reverse`.
    pub fn build_query(&self) -> String {
        format!(
            r#"query Pools($base: String!, $quote: String!, $first: Int!) {{
  forward: pools(first: $first, orderBy: {field}, orderDirection: desc, where: {{ token0_: {{ symbol_contains_nocase: $base }}, token1_: {{ symbol_contains_nocase: $quote }} }}) {{ ...PoolFields }}
  reverse: pools(first: $first, orderBy: {field}, orderDirection: desc, where: {{ token0_: {{ symbol_contains_nocase: $quote }}, token1_: {{ symbol_contains_nocase: $base }} }}) {{ ...PoolFields }}
}}
fragment PoolFields on Pool {{ id token0Price token1Price {field} token0 {{ id symbol }} token1 {{ id symbol }} }}"#,
            field = self.liquidity_field
        )
    }

    pub fn build_variables(pair: &TokenPair) -> Value {
        json!({
            "base": pair.base,
            "quote": pair.quote,
            "first": POOLS_PER_ORIENTATION,
        })
    }

    /// Collects `forward` then `reverse` pools, keeping response order.
    pub fn parse_candidates(&self, data: &Value) -> Result<Vec<PoolCandidate>> {
        let mut candidates = Vec::new();
        for alias in ["forward", "reverse"] {
            let pools = data
                .get(alias)
                .and_then(Value::as_array)
                .ok_or_else(|| ArbError::ParseError(format!("{}: missing '{}' pools", self.venue_id, alias)))?;
            for pool in pools {
                candidates.push(candidate_from_subgraph(pool, self.liquidity_field)?);
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl VenueAdapter for SubgraphPoolAdapter {
    fn venue_id(&self) -> &str {
        &self.venue_id
    }

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        let variables = Self::build_variables(pair);
        let data = client
            .execute(&venue.endpoint, &self.build_query(), Some(&variables))
            .await?
            .into_data()?;
        let candidates = self.parse_candidates(&data)?;
        debug!("{}: {} candidate pools for {}", self.venue_id, candidates.len(), pair);
        Ok(select_best_pool(&self.venue_id, pair, &candidates, now_unix()))
    }
}
