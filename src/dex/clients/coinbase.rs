// src/dex/clients/coinbase.rs

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::dex::pool::required_f64;
use crate::dex::quote::VenueAdapter;
use crate::error::{ArbError, Result};
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;

/// Coinbase spot price, one request per pair: `{endpoint}/{BASE-QUOTE}/spot`.
#[derive(Default)]
pub struct CoinbaseAdapter;

impl CoinbaseAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn spot_url(endpoint: &str, pair: &TokenPair) -> String {
        format!("{}/{}/spot", endpoint.trim_end_matches('/'), pair.venue_symbol("coinbase"))
    }

    pub fn parse_spot(data: &Value, pair: &TokenPair, observed_at: i64) -> Result<Option<PricePoint>> {
        let spot = data
            .get("data")
            .ok_or_else(|| ArbError::ParseError("coinbase: missing 'data'".into()))?;
        let price = required_f64(spot, "amount")?;
        if !(price.is_finite() && price > 0.0) {
            return Ok(None);
        }
        Ok(Some(PricePoint::new("coinbase", pair, price, 0.0, observed_at)))
    }
}

#[async_trait]
impl VenueAdapter for CoinbaseAdapter {
    fn venue_id(&self) -> &str {
        "coinbase"
    }

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        let url = Self::spot_url(&venue.endpoint, pair);
        match client.get_json(&url).await {
            Ok(response) => Self::parse_spot(&response.into_data()?, pair, now_unix()),
            // Unlisted products answer 404.
            Err(ArbError::HttpStatus { status: 404, .. }) => {
                debug!("coinbase: {} is not listed", pair);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    #[test]
    fn test_spot_url() {
        assert_eq!(
            CoinbaseAdapter::spot_url("https://api.coinbase.com/v2/prices/", &TokenPair::new("weth", "usdt")),
            "https://api.coinbase.com/v2/prices/WETH-USDT/spot"
        );
    }

    #[test]
    fn test_parse_spot() {
        let data = json!({ "data": { "base": "WETH", "currency": "USDT", "amount": "2489.17" } });
        let point = CoinbaseAdapter::parse_spot(&data, &TokenPair::new("WETH", "USDT"), 9)
            .unwrap()
            .unwrap();
        assert_approx_eq!(point.price, 2489.17);
        assert!(CoinbaseAdapter::parse_spot(&json!({ "errors": [] }), &TokenPair::new("WETH", "USDT"), 9).is_err());
    }
}
