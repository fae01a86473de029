use crate::utils::{PricePoint, TokenPair};
use dashmap::DashMap;
use std::collections::VecDeque;

pub const DEFAULT_FALLBACK_CAPACITY: usize = 10;
pub const DEFAULT_RETENTION_SECS: i64 = 3600;

/// In-process stand-in for the fast tier: the most recent `capacity` samples per
/// `(venue, pair)` no older than `retention_secs`, kept sorted by `observed_at`.
#[derive(Debug)]
pub struct InMemoryFallback {
    entries: DashMap<String, VecDeque<PricePoint>>,
    capacity: usize,
    retention_secs: i64,
}

impl Default for InMemoryFallback {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_CAPACITY, DEFAULT_RETENTION_SECS)
    }
}

impl InMemoryFallback {
    pub fn new(capacity: usize, retention_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            retention_secs,
        }
    }

    fn key(venue: &str, pair: &TokenPair) -> String {
        format!("{}:{}", venue, pair.key())
    }

    /// Inserts by timestamp, so the newest sample is always at the back no matter
    /// the arrival order. A sample with an existing timestamp replaces it.
    /// Samples older than `now - retention_secs` are pruned, as on the fast tier.
    pub fn insert(&self, point: &PricePoint, now: i64) {
        let mut samples = self.entries.entry(Self::key(&point.venue, &point.pair)).or_default();
        match samples.binary_search_by_key(&point.observed_at, |p| p.observed_at) {
            Ok(idx) => samples[idx] = point.clone(),
            Err(idx) => samples.insert(idx, point.clone()),
        }
        let cutoff = now - self.retention_secs;
        while samples.front().map_or(false, |p| p.observed_at < cutoff) {
            samples.pop_front();
        }
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    pub fn latest(&self, venue: &str, pair: &TokenPair) -> Option<PricePoint> {
        self.entries
            .get(&Self::key(venue, pair))
            .and_then(|samples| samples.back().cloned())
    }

    /// Samples with `from <= observed_at <= to`, ascending.
    pub fn history(&self, venue: &str, pair: &TokenPair, from: i64, to: i64) -> Vec<PricePoint> {
        self.entries
            .get(&Self::key(venue, pair))
            .map(|samples| {
                samples
                    .iter()
                    .filter(|p| p.observed_at >= from && p.observed_at <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(ts: i64) -> PricePoint {
        PricePoint::new("quickswap", &TokenPair::new("MATIC", "USDT"), ts as f64, 1.0, ts)
    }

    #[test]
    fn test_out_of_order_write_does_not_replace_latest() {
        let map = InMemoryFallback::default();
        map.insert(&sample(100), 100);
        map.insert(&sample(50), 100);
        let pair = TokenPair::new("MATIC", "USDT");
        assert_eq!(map.latest("quickswap", &pair).unwrap().observed_at, 100);
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let map = InMemoryFallback::new(3, 3600);
        for ts in [5, 1, 4, 2, 3] {
            map.insert(&sample(ts), 5);
        }
        let pair = TokenPair::new("MATIC", "USDT");
        let stamps: Vec<i64> = map.history("quickswap", &pair, 0, 10).iter().map(|p| p.observed_at).collect();
        assert_eq!(stamps, vec![3, 4, 5]);
        assert!(map.latest("sushiswap", &pair).is_none());
    }

    #[test]
    fn test_samples_past_retention_are_pruned() {
        let map = InMemoryFallback::new(10, 3600);
        let pair = TokenPair::new("MATIC", "USDT");
        map.insert(&sample(1_000), 1_000);
        map.insert(&sample(2_000), 2_000);
        assert_eq!(map.history("quickswap", &pair, 0, 10_000).len(), 2);

        // cutoff = 4_700 - 3_600 = 1_100
        map.insert(&sample(4_700), 4_700);
        let stamps: Vec<i64> = map.history("quickswap", &pair, 0, 10_000).iter().map(|p| p.observed_at).collect();
        assert_eq!(stamps, vec![2_000, 4_700]);

        // A sample already past retention does not survive its own insert.
        map.insert(&sample(500), 4_700);
        assert_eq!(map.history("quickswap", &pair, 0, 1_000).len(), 0);
    }
}
