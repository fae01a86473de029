//! Per-venue trading fees in percent.

use crate::config::Config;
use std::collections::HashMap;

/// Taker fees for centralized venues that may appear without a configured fee.
const CEX_FALLBACK_FEES: &[(&str, f64)] = &[
    ("binance", 0.1),
    ("coinbase", 0.5),
    ("bitbank", 0.12),
    ("bitflyer", 0.15),
    ("coincheck", 0.2),
    ("zaif", 0.2),
    ("bittrade", 0.15),
];

pub const DEFAULT_FEE_PCT: f64 = 0.2;

#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    configured: HashMap<String, f64>,
}

impl FeeSchedule {
    pub fn new(configured: HashMap<String, f64>) -> Self {
        Self { configured }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .venues
                .values()
                .map(|v| (v.id.clone(), v.fee_pct))
                .collect(),
        )
    }

    /// Configured fee, else the centralized-venue table, else [`DEFAULT_FEE_PCT`].
    pub fn fee_pct(&self, venue: &str) -> f64 {
        if let Some(fee) = self.configured.get(venue) {
            return *fee;
        }
        CEX_FALLBACK_FEES
            .iter()
            .find(|(id, _)| *id == venue)
            .map(|(_, fee)| *fee)
            .unwrap_or(DEFAULT_FEE_PCT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_fee_lookup_order() {
        let schedule = FeeSchedule::new(HashMap::from([("binance".to_string(), 0.075)]));
        assert_approx_eq!(schedule.fee_pct("binance"), 0.075);
        assert_approx_eq!(schedule.fee_pct("bitflyer"), 0.15);
        assert_approx_eq!(schedule.fee_pct("some_new_dex"), DEFAULT_FEE_PCT);
    }
}
