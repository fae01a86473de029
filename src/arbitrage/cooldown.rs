use crate::utils::TokenPair;
use std::collections::HashMap;

/// Identity of an alert for suppression purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    pub buy_venue: String,
    pub sell_venue: String,
    pub pair: String,
}

impl CooldownKey {
    pub fn new(buy_venue: &str, sell_venue: &str, pair: &TokenPair) -> Self {
        Self {
            buy_venue: buy_venue.to_string(),
            sell_venue: sell_venue.to_string(),
            pair: pair.key(),
        }
    }
}

/// Detector-owned cooldown ledger: (buy venue, sell venue, pair) -> last notification time.
/// Entries live for the whole process; they only gate notifications, never detection.
#[derive(Debug, Default)]
pub struct DetectorState {
    last_notified: HashMap<CooldownKey, i64>,
    cooldown_secs: i64,
}

impl DetectorState {
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            last_notified: HashMap::new(),
            cooldown_secs,
        }
    }

    pub fn is_suppressed(&self, key: &CooldownKey, now: i64) -> bool {
        match self.last_notified.get(key) {
            Some(&last) => now - last < self.cooldown_secs,
            None => false,
        }
    }

    /// Returns true and stamps the entry with `now` when `key` is outside its cooldown.
    pub fn try_notify(&mut self, key: CooldownKey, now: i64) -> bool {
        if self.is_suppressed(&key, now) {
            return false;
        }
        self.last_notified.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.last_notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_notified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_window() {
        let mut state = DetectorState::new(300);
        let key = CooldownKey::new("uniswap_v3", "binance", &TokenPair::new("WETH", "USDT"));

        assert!(state.try_notify(key.clone(), 1_000));
        assert!(!state.try_notify(key.clone(), 1_010));
        // Measured from the last notification, not the last detection.
        assert!(!state.try_notify(key.clone(), 1_299));
        assert!(state.try_notify(key.clone(), 1_301));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_keys_are_direction_sensitive() {
        let mut state = DetectorState::new(300);
        let pair = TokenPair::new("WETH", "USDT");
        assert!(state.try_notify(CooldownKey::new("a", "b", &pair), 0));
        assert!(state.try_notify(CooldownKey::new("b", "a", &pair), 0));
        assert!(state.try_notify(CooldownKey::new("a", "b", &TokenPair::new("WBTC", "USDT")), 0));
        assert!(!state.is_empty());
    }
}
