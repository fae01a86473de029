// src/dex/mod.rs

pub mod clients;
pub mod http_utils;
pub mod pool;
pub mod quote;

pub use http_utils::{QueryClient, QueryResponse};
pub use quote::VenueAdapter;

use crate::config::{Config, VenueConfig};
use crate::error::{ArbError, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Venue id -> adapter table, built once at startup. Supporting a new venue
/// means registering another `VenueAdapter`.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn VenueAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under its own venue id, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn VenueAdapter>) {
        let id = adapter.venue_id().to_string();
        if self.adapters.insert(id.clone(), adapter).is_some() {
            warn!("Adapter for venue '{}' replaced", id);
        }
    }

    pub fn get(&self, venue_id: &str) -> Option<Arc<dyn VenueAdapter>> {
        self.adapters.get(venue_id).cloned()
    }

    pub fn require(&self, venue_id: &str) -> Result<Arc<dyn VenueAdapter>> {
        self.get(venue_id)
            .ok_or_else(|| ArbError::UnknownVenue(venue_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Pairs each configured venue with its adapter. Venues with no registered
    /// adapter are skipped with a warning.
    pub fn active_venues(&self, config: &Config) -> Vec<(VenueConfig, Arc<dyn VenueAdapter>)> {
        config
            .venues
            .values()
            .filter_map(|venue| match self.require(&venue.id) {
                Ok(adapter) => Some((venue.clone(), adapter)),
                Err(e) => {
                    warn!("{} (no adapter registered), skipping it", e);
                    None
                }
            })
            .collect()
    }
}

/// Registry holding every built-in venue adapter.
pub fn get_all_adapters() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();

    info!("Initializing venue adapters...");

    registry.register(Arc::new(clients::SubgraphPoolAdapter::uniswap_v3()));
    info!("- Uniswap V3 adapter initialized.");

    registry.register(Arc::new(clients::SubgraphPoolAdapter::quickswap()));
    info!("- QuickSwap adapter initialized.");

    registry.register(Arc::new(clients::SushiSwapAdapter::new()));
    info!("- SushiSwap adapter initialized.");

    registry.register(Arc::new(clients::BalancerAdapter::new()));
    info!("- Balancer adapter initialized.");

    registry.register(Arc::new(clients::BinanceAdapter::new()));
    info!("- Binance adapter initialized.");

    registry.register(Arc::new(clients::CoinbaseAdapter::new()));
    info!("- Coinbase adapter initialized.");

    info!("Total venue adapters initialized: {}", registry.len());
    registry
}
