// src/dex/quote.rs

use crate::config::VenueConfig;
use crate::dex::http_utils::QueryClient;
use crate::error::Result;
use crate::utils::{PricePoint, TokenPair};
use async_trait::async_trait;

/// A price source. Implementations build the venue-specific request for a pair,
/// pick the deepest matching pool and normalize the price to quote-per-base.
///
/// Outcomes are kept apart:
/// * `Ok(Some(point))` - a usable price was found
/// * `Ok(None)` - the venue answered but lists no qualifying pool for the pair
/// * `Err(_)` - transport failure, remote errors or an unexpected response shape
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Venue id this adapter is registered under (e.g. "uniswap_v3").
    fn venue_id(&self) -> &str;

    async fn fetch_price(
        &self,
        client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>>;
}
