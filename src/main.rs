// src/main.rs
use anyhow::Context;
use dex_arb_monitor::{
    arbitrage::{ArbitrageDetector, PriceAggregator},
    config::load_config,
    data::{PriceStore, TieredPriceStore},
    dex::{get_all_adapters, QueryClient},
    notification::{NotificationSink, SlackNotifier},
    utils::setup_logging,
};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Configuration & Logging ---
    let app_config = load_config().context("Failed to load configuration")?;
    setup_logging(app_config.log_level_filter(), app_config.log_file.as_deref())
        .context("Failed to initialize logging")?;
    info!("DEX/CEX arbitrage monitor starting...");
    app_config.log_summary();

    // --- Storage: durable log is mandatory, Redis is optional ---
    let store: Arc<dyn PriceStore> = Arc::new(
        TieredPriceStore::connect(&app_config)
            .await
            .context("Failed to initialize price store")?,
    );

    // --- Venues, query client, notifications ---
    let registry = get_all_adapters();
    let query_client = Arc::new(QueryClient::from_config(&app_config)?);
    let slack = SlackNotifier::new(app_config.slack_webhook_url.clone())?;
    if slack.is_enabled() {
        info!("Slack notifications enabled.");
    }
    let notifier: Arc<dyn NotificationSink> = Arc::new(slack);

    let aggregator =
        PriceAggregator::from_config(&app_config, query_client, &registry, store.clone());
    let detector = ArbitrageDetector::new(&app_config, store, notifier);

    let aggregator_handle = tokio::spawn(aggregator.run());
    let detector_handle = tokio::spawn(detector.run());
    info!("Aggregation and detection loops running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping loops...");

    aggregator_handle.abort();
    detector_handle.abort();
    for (name, handle) in [("aggregator", aggregator_handle), ("detector", detector_handle)] {
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                error!("{} task ended abnormally: {}", name, e);
            }
        }
    }
    info!("Shutdown complete.");
    Ok(())
}
