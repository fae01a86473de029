pub mod cooldown;
pub mod detector;
pub mod fee_manager;
pub mod opportunity;
pub mod price_aggregator;

pub use cooldown::{CooldownKey, DetectorState};
pub use detector::{find_opportunities, ArbitrageDetector, DetectionReport};
pub use fee_manager::FeeSchedule;
pub use opportunity::ArbitrageOpportunity;
pub use price_aggregator::{PriceAggregator, TickReport};
