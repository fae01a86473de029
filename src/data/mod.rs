//! Price persistence: the `PriceStore` contract shared by the aggregation and
//! detection loops, and its tiered implementation.

pub mod durable;
pub mod memory;
pub mod store;

pub use durable::DurableLog;
pub use memory::InMemoryFallback;
pub use store::TieredPriceStore;

use crate::arbitrage::opportunity::ArbitrageOpportunity;
use crate::error::Result;
use crate::utils::{PricePoint, TokenPair};
use async_trait::async_trait;
use std::collections::HashMap;

/// The only state shared between the aggregator and the detector.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Records a sample under its `(venue, pair)` key.
    async fn save(&self, point: &PricePoint) -> Result<()>;

    /// Freshest sample per venue for `pair`; venues without a fresh sample are omitted.
    async fn latest(&self, pair: &TokenPair) -> Result<HashMap<String, PricePoint>>;

    /// Samples for `(venue, pair)` with `from <= observed_at <= to`, ascending, one per timestamp.
    async fn history(&self, venue: &str, pair: &TokenPair, from: i64, to: i64) -> Result<Vec<PricePoint>>;

    /// Appends a detected opportunity to the audit log.
    async fn save_opportunity(&self, opportunity: &ArbitrageOpportunity) -> Result<()>;
}
