pub mod arbitrage;
pub mod cache;
pub mod config;
pub mod data;
pub mod dex;
pub mod error;
pub mod notification;
pub mod utils;

pub use arbitrage::{ArbitrageDetector, ArbitrageOpportunity, PriceAggregator};
pub use config::{load_config, Config, VenueConfig};
pub use data::{PriceStore, TieredPriceStore};
pub use dex::{get_all_adapters, AdapterRegistry, QueryClient, VenueAdapter};
pub use error::ArbError;
pub use notification::{NotificationSink, SlackNotifier};
pub use utils::{PricePoint, TokenPair};
