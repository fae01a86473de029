// src/arbitrage/detector.rs
use crate::{
    arbitrage::{cooldown::DetectorState, fee_manager::FeeSchedule, opportunity::ArbitrageOpportunity},
    config::Config,
    data::PriceStore,
    error::Result,
    notification::NotificationSink,
    utils::{now_unix, PricePoint, TokenPair},
};
use itertools::Itertools;
use log::{debug, error, info, warn};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::sleep;

/// Outcome counters for one detection cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetectionReport {
    pub pairs_scanned: usize,
    pub detected: usize,
    pub notified: usize,
    pub suppressed: usize,
}

/// Pairwise cross-venue comparison for one pair.
///
/// Every unordered venue pair is checked in both directions. Buying on X and
/// selling on Y qualifies when `(p_Y - p_X) / p_X * 100 > fee(X) + fee(Y) + slippage + threshold`.
/// A venue pair can therefore yield two opportunities in one call. Venues are
/// visited in name order so output is deterministic.
pub fn find_opportunities(
    pair: &TokenPair,
    latest: &HashMap<String, PricePoint>,
    fees: &FeeSchedule,
    slippage_pct: f64,
    threshold_pct: f64,
    now: i64,
) -> Vec<ArbitrageOpportunity> {
    let mut found = Vec::new();
    let venues: Vec<&PricePoint> = latest
        .values()
        .sorted_by(|a, b| a.venue.cmp(&b.venue))
        .collect();

    for (a, b) in venues.into_iter().tuple_combinations() {
        if !(a.price.is_finite() && a.price > 0.0 && b.price.is_finite() && b.price > 0.0) {
            debug!(
                "Skipping {} {} vs {}: non-positive price ({} / {})",
                pair, a.venue, b.venue, a.price, b.price
            );
            continue;
        }
        let fees_pct = fees.fee_pct(&a.venue) + fees.fee_pct(&b.venue);
        let cost_pct = fees_pct + slippage_pct;

        for (buy, sell) in [(a, b), (b, a)] {
            let diff_pct = (sell.price - buy.price) / buy.price * 100.0;
            if diff_pct > cost_pct + threshold_pct {
                found.push(ArbitrageOpportunity {
                    pair: pair.clone(),
                    buy_venue: buy.venue.clone(),
                    sell_venue: sell.venue.clone(),
                    buy_price: buy.price,
                    sell_price: sell.price,
                    price_diff_pct: diff_pct,
                    fees_pct,
                    slippage_pct,
                    net_profit_pct: diff_pct - cost_pct,
                    detected_at: now,
                });
            }
        }
    }
    found
}

pub struct ArbitrageDetector {
    store: Arc<dyn PriceStore>,
    sink: Arc<dyn NotificationSink>,
    fees: FeeSchedule,
    pairs: Vec<TokenPair>,
    slippage_pct: f64,
    threshold_pct: f64,
    interval: Duration,
    error_retry_delay: Duration,
    state: DetectorState,
}

impl ArbitrageDetector {
    pub fn new(config: &Config, store: Arc<dyn PriceStore>, sink: Arc<dyn NotificationSink>) -> Self {
        info!(
            "ArbitrageDetector initialized: threshold={:.2}% slippage={:.2}% cooldown={}s pairs={}",
            config.arbitrage_threshold_pct,
            config.slippage_tolerance_pct,
            config.notification_cooldown_secs,
            config.token_pairs.len()
        );
        Self {
            store,
            sink,
            fees: FeeSchedule::from_config(config),
            pairs: config.token_pairs.clone(),
            slippage_pct: config.slippage_tolerance_pct,
            threshold_pct: config.arbitrage_threshold_pct,
            interval: config.price_update_interval(),
            error_retry_delay: config.error_retry_delay(),
            state: DetectorState::new(config.notification_cooldown_secs),
        }
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// One Load -> Detect -> Dedup -> Emit pass over all configured pairs at time `now`.
    pub async fn run_cycle(&mut self, now: i64) -> Result<DetectionReport> {
        let mut report = DetectionReport::default();

        for pair in &self.pairs {
            let latest = self.store.latest(pair).await?;
            if latest.len() < 2 {
                debug!("{}: {} venue(s) reporting, skipping", pair, latest.len());
                continue;
            }
            report.pairs_scanned += 1;

            let opportunities = find_opportunities(
                pair,
                &latest,
                &self.fees,
                self.slippage_pct,
                self.threshold_pct,
                now,
            );

            for opportunity in opportunities {
                report.detected += 1;
                info!(
                    "Opportunity {}: buy {} @ {:.8}, sell {} @ {:.8}, net {:.2}%",
                    pair,
                    opportunity.buy_venue,
                    opportunity.buy_price,
                    opportunity.sell_venue,
                    opportunity.sell_price,
                    opportunity.net_profit_pct
                );

                if let Err(e) = self.store.save_opportunity(&opportunity).await {
                    error!("Failed to persist opportunity for {}: {}", pair, e);
                }

                if self.state.try_notify(opportunity.cooldown_key(), now) {
                    // Delivery runs detached so a slow webhook never stalls the cycle.
                    let sink = Arc::clone(&self.sink);
                    let message = opportunity.format_message();
                    tokio::spawn(async move { sink.send(&message).await });
                    report.notified += 1;
                } else {
                    debug!(
                        "Notification for {} {}->{} suppressed by cooldown",
                        pair, opportunity.buy_venue, opportunity.sell_venue
                    );
                    report.suppressed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Detection loop; runs until the process exits.
    pub async fn run(mut self) {
        info!("Arbitrage detection loop started (interval {:?})", self.interval);
        loop {
            match self.run_cycle(now_unix()).await {
                Ok(report) => {
                    if report.detected > 0 {
                        info!(
                            "Detection cycle: {} opportunities ({} notified, {} suppressed)",
                            report.detected, report.notified, report.suppressed
                        );
                    }
                    sleep(self.interval).await;
                }
                Err(e) => {
                    warn!("Detection cycle failed: {}. Retrying in {:?}", e, self.error_retry_delay);
                    sleep(self.error_retry_delay).await;
                }
            }
        }
    }
}
