use super::memory::DEFAULT_FALLBACK_CAPACITY;
use super::{DurableLog, InMemoryFallback, PriceStore};
use crate::arbitrage::opportunity::ArbitrageOpportunity;
use crate::cache::{Cache, CachedPrice};
use crate::config::Config;
use crate::error::Result;
use crate::utils::{now_unix, PricePoint, TokenPair};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// Below this many fast-tier samples, `history` also consults the durable log.
const HISTORY_MERGE_THRESHOLD: usize = 10;

/// Redis fast tier (optional) + in-process fallback + SQLite durable log.
///
/// The fallback map is written on every save, so a Redis read error can be
/// answered from it without changing what callers observe.
pub struct TieredPriceStore {
    fast: Option<Cache>,
    fallback: InMemoryFallback,
    durable: DurableLog,
    venues: Vec<String>,
    cache_ttl_secs: i64,
}

impl TieredPriceStore {
    pub fn new(fast: Option<Cache>, durable: DurableLog, venues: Vec<String>, cache_ttl_secs: i64) -> Self {
        Self {
            fast,
            fallback: InMemoryFallback::new(DEFAULT_FALLBACK_CAPACITY, cache_ttl_secs),
            durable,
            venues,
            cache_ttl_secs,
        }
    }

    /// Opens the durable log (fatal on failure) and tries Redis. An unreachable
    /// Redis only switches the store into degraded mode.
    pub async fn connect(config: &Config) -> Result<Self> {
        let durable = DurableLog::open(&config.database_path)?;
        let fast = match Cache::new(&config.redis_url, config.cache_ttl_secs).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(
                    "Redis unavailable at startup ({}); running with the in-process fallback cache",
                    e
                );
                None
            }
        };
        let store = Self::new(
            fast,
            durable,
            config.venues.keys().cloned().collect(),
            config.cache_ttl_secs,
        );
        info!(
            "Price store ready ({} venues, fast tier {})",
            store.venues.len(),
            if store.is_degraded() { "disabled" } else { "enabled" }
        );
        Ok(store)
    }

    pub fn is_degraded(&self) -> bool {
        self.fast.is_none()
    }

    pub fn durable(&self) -> &DurableLog {
        &self.durable
    }

    fn is_fresh(&self, observed_at: i64, now: i64) -> bool {
        now - observed_at <= self.cache_ttl_secs
    }

    async fn read_latest(&self, venue: &str, pair: &TokenPair) -> Option<PricePoint> {
        let fast = match &self.fast {
            Some(fast) => fast,
            None => return self.fallback.latest(venue, pair),
        };
        match fast.get_latest(venue, &pair.key()).await {
            Ok(cached) => cached.map(|c| PricePoint::new(venue, pair, c.price, c.liquidity, c.timestamp)),
            Err(e) => {
                warn!("Fast tier read failed for {} {}: {}; using fallback", venue, pair, e);
                self.fallback.latest(venue, pair)
            }
        }
    }

    async fn read_recent_history(&self, venue: &str, pair: &TokenPair, from: i64, to: i64) -> Vec<PricePoint> {
        let fast = match &self.fast {
            Some(fast) => fast,
            None => return self.fallback.history(venue, pair, from, to),
        };
        match fast.get_history(venue, &pair.key(), from, to).await {
            Ok(entries) => entries
                .into_iter()
                .map(|c: CachedPrice| PricePoint::new(venue, pair, c.price, c.liquidity, c.timestamp))
                .collect(),
            Err(e) => {
                warn!("Fast tier history failed for {} {}: {}; using fallback", venue, pair, e);
                self.fallback.history(venue, pair, from, to)
            }
        }
    }
}

#[async_trait]
impl PriceStore for TieredPriceStore {
    async fn save(&self, point: &PricePoint) -> Result<()> {
        let now = now_unix();
        self.fallback.insert(point, now);

        if let Some(fast) = &self.fast {
            // Fast-tier failures leave the fallback and durable log authoritative.
            if let Err(e) = fast.store_latest(point).await {
                debug!("Latest-slot write skipped: {}", e);
            }
            if let Err(e) = fast.append_history(point, now).await {
                debug!("History append skipped: {}", e);
            }
        }

        self.durable.insert_price(point).await
    }

    async fn latest(&self, pair: &TokenPair) -> Result<HashMap<String, PricePoint>> {
        let now = now_unix();
        let mut latest = HashMap::new();
        for venue in &self.venues {
            match self.read_latest(venue, pair).await {
                Some(point) if self.is_fresh(point.observed_at, now) => {
                    latest.insert(venue.clone(), point);
                }
                Some(point) => {
                    debug!("Ignoring stale {} {} sample from {}", venue, pair, point.observed_at);
                }
                None => {}
            }
        }
        Ok(latest)
    }

    async fn history(&self, venue: &str, pair: &TokenPair, from: i64, to: i64) -> Result<Vec<PricePoint>> {
        let recent = self.read_recent_history(venue, pair, from, to).await;
        if recent.len() >= HISTORY_MERGE_THRESHOLD {
            return Ok(recent);
        }

        let mut merged: BTreeMap<i64, PricePoint> = self
            .durable
            .price_history(venue, pair, from, to)
            .await?
            .into_iter()
            .map(|p| (p.observed_at, p))
            .collect();
        for point in recent {
            merged.insert(point.observed_at, point);
        }
        Ok(merged.into_values().collect())
    }

    async fn save_opportunity(&self, opportunity: &ArbitrageOpportunity) -> Result<()> {
        self.durable.insert_opportunity(opportunity).await
    }
}
