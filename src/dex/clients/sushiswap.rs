// src/dex/clients/sushiswap.rs
//! SushiSwap exchange subgraph. Symbol filtering on `pairs` is unreliable there,
//! so one bulk query of the deepest pairs is fetched and matched locally.

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::dex::pool::{candidate_from_subgraph, required_array, select_best_pool, PoolCandidate};
use crate::dex::quote::VenueAdapter;
use crate::error::Result;
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

const BULK_PAIRS_QUERY: &str = r#"{
  pairs(first: 100, orderBy: reserveUSD, orderDirection: desc) {
    id
    token0 { id symbol }
    token1 { id symbol }
    token0Price
    token1Price
    reserveUSD
  }
}"#;

#[derive(Default)]
pub struct SushiSwapAdapter;

impl SushiSwapAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Keeps the bulk entries whose two symbols are exactly `pair`, in either
    /// order. A malformed entry is skipped so it cannot hide the other pairs.
    pub fn parse_candidates(data: &Value, pair: &TokenPair) -> Result<Vec<PoolCandidate>> {
        let mut candidates = Vec::new();
        for entry in required_array(data, "pairs")? {
            let symbols = (
                entry.pointer("/token0/symbol").and_then(Value::as_str),
                entry.pointer("/token1/symbol").and_then(Value::as_str),
            );
            let (symbol0, symbol1) = match symbols {
                (Some(s0), Some(s1)) => (s0.to_uppercase(), s1.to_uppercase()),
                _ => {
                    debug!("sushiswap: skipping pair entry without token symbols: {}", entry);
                    continue;
                }
            };
            let matches = (symbol0 == pair.base && symbol1 == pair.quote)
                || (symbol0 == pair.quote && symbol1 == pair.base);
            if !matches {
                continue;
            }
            match candidate_from_subgraph(entry, "reserveUSD") {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => debug!("sushiswap: skipping malformed {} entry: {}", pair, e),
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl VenueAdapter for SushiSwapAdapter {
    fn venue_id(&self) -> &str {
        "sushiswap"
    }

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        let data = client
            .execute(&venue.endpoint, BULK_PAIRS_QUERY, None)
            .await?
            .into_data()?;
        let candidates = Self::parse_candidates(&data, pair)?;
        debug!("sushiswap: {} bulk pairs match {}", candidates.len(), pair);
        Ok(select_best_pool(self.venue_id(), pair, &candidates, now_unix()))
    }
}
