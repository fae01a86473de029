// src/dex/clients/binance.rs
//! Binance spot ticker. The endpoint returns every symbol at once; the pair's
//! `BASEQUOTE` symbol is looked up locally.

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::dex::pool::required_f64;
use crate::dex::quote::VenueAdapter;
use crate::error::{ArbError, Result};
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Default)]
pub struct BinanceAdapter;

impl BinanceAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Finds the ticker for `pair` in the bulk list. Centralized tickers have no
    /// pool depth, so liquidity is reported as zero.
    pub fn parse_ticker(data: &Value, pair: &TokenPair, observed_at: i64) -> Result<Option<PricePoint>> {
        let tickers = data
            .as_array()
            .ok_or_else(|| ArbError::ParseError("binance: ticker response is not an array".into()))?;
        let symbol = pair.venue_symbol("binance");
        let ticker = tickers
            .iter()
            .find(|t| t.get("symbol").and_then(Value::as_str) == Some(symbol.as_str()));
        let ticker = match ticker {
            Some(t) => t,
            None => return Ok(None),
        };
        let price = required_f64(ticker, "price")?;
        if !(price.is_finite() && price > 0.0) {
            return Ok(None);
        }
        Ok(Some(PricePoint::new("binance", pair, price, 0.0, observed_at)))
    }
}

#[async_trait]
impl VenueAdapter for BinanceAdapter {
    fn venue_id(&self) -> &str {
        "binance"
    }

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        let data = client.get_json(&venue.endpoint).await?.into_data()?;
        Self::parse_ticker(&data, pair, now_unix())
    }
}
