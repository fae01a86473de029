//! Price aggregation loop.
//!
//! Each tick fans out one fetch per `(venue, pair)`, waits for all of them,
//! and persists every price that came back. A failing venue only costs its
//! own samples for that tick.

use crate::{
    config::{Config, VenueConfig},
    data::PriceStore,
    dex::{AdapterRegistry, QueryClient, VenueAdapter},
    error::{ArbError, Result},
    utils::{now_unix, PricePoint, TokenPair},
};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

/// Outcome counters for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub attempted: usize,
    pub fetched: usize,
    pub absent: usize,
    pub failed: usize,
    pub persisted: usize,
}

pub struct PriceAggregator {
    client: Arc<QueryClient>,
    venues: Vec<(VenueConfig, Arc<dyn VenueAdapter>)>,
    pairs: Vec<TokenPair>,
    store: Arc<dyn PriceStore>,
    interval: Duration,
    error_retry_delay: Duration,
}

impl PriceAggregator {
    pub fn new(
        client: Arc<QueryClient>,
        venues: Vec<(VenueConfig, Arc<dyn VenueAdapter>)>,
        pairs: Vec<TokenPair>,
        store: Arc<dyn PriceStore>,
        interval: Duration,
        error_retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            venues,
            pairs,
            store,
            interval,
            error_retry_delay,
        }
    }

    pub fn from_config(
        config: &Config,
        client: Arc<QueryClient>,
        registry: &AdapterRegistry,
        store: Arc<dyn PriceStore>,
    ) -> Self {
        let venues = registry.active_venues(config);
        info!(
            "PriceAggregator tracking {} pairs across {} venues",
            config.token_pairs.len(),
            venues.len()
        );
        Self::new(
            client,
            venues,
            config.token_pairs.clone(),
            store,
            config.price_update_interval(),
            config.error_retry_delay(),
        )
    }

    /// Runs one FanOut -> Collect -> Persist pass. Every persisted sample is
    /// stamped with `tick_ts`.
    pub async fn run_tick(&self, tick_ts: i64) -> Result<TickReport> {
        let mut report = TickReport::default();

        let tasks = self.venues.iter().flat_map(|(venue, adapter)| {
            self.pairs.iter().map(move |pair| {
                let client = Arc::clone(&self.client);
                let adapter = Arc::clone(adapter);
                let venue = venue.clone();
                let pair = pair.clone();
                let label = format!("{} {}", venue.id, pair);
                let handle =
                    tokio::spawn(async move { adapter.fetch_price(&client, &venue, &pair).await });
                async move { (label, handle.await) }
            })
        });
        let results = join_all(tasks).await;
        report.attempted = results.len();

        let mut to_persist: Vec<PricePoint> = Vec::new();
        for (label, outcome) in results {
            match outcome {
                Ok(Ok(Some(point))) => {
                    report.fetched += 1;
                    to_persist.push(point.observed(tick_ts));
                }
                Ok(Ok(None)) => {
                    report.absent += 1;
                    debug!("{}: no qualifying price this tick", label);
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!("{}: fetch failed: {}", label, e);
                }
                Err(join_err) => {
                    report.failed += 1;
                    error!("{}: fetch task aborted: {}", label, join_err);
                }
            }
        }

        let mut last_error: Option<ArbError> = None;
        for point in &to_persist {
            match self.store.save(point).await {
                Ok(()) => report.persisted += 1,
                Err(e) => {
                    error!("Failed to persist {} {}: {}", point.venue, point.pair, e);
                    last_error = Some(e);
                }
            }
        }

        info!(
            "Tick {}: {} fetches, {} prices, {} absent, {} failed, {} persisted",
            tick_ts, report.attempted, report.fetched, report.absent, report.failed, report.persisted
        );

        match last_error {
            // Nothing could be written at all: surface it so the loop backs off.
            Some(e) if report.persisted == 0 => Err(e),
            _ => Ok(report),
        }
    }

    /// Polling loop; runs until the process exits.
    pub async fn run(self) {
        info!("Price aggregation loop started (interval {:?})", self.interval);
        loop {
            match self.run_tick(now_unix()).await {
                Ok(_) => sleep(self.interval).await,
                Err(e) => {
                    error!("Aggregation tick failed: {}. Retrying in {:?}", e, self.error_retry_delay);
                    sleep(self.error_retry_delay).await;
                }
            }
        }
    }
}
