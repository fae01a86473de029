// src/cache.rs
//! Redis fast tier: the latest price per `(venue, pair)` and a rolling one-hour
//! history per key.

use crate::error::ArbError;
use crate::utils::PricePoint;
use log::{debug, error, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Replaces the latest slot only when the incoming timestamp is not older than
/// the stored one. Returns 1 when written, 0 when the stored value was newer.
const STORE_IF_NEWER_LUA: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
  local ok, decoded = pcall(cjson.decode, current)
  if ok and type(decoded) == 'table' and tonumber(decoded['timestamp']) ~= nil
     and tonumber(decoded['timestamp']) > tonumber(ARGV[2]) then
    return 0
  end
end
redis.call('SET', KEYS[1], ARGV[1], 'EX', tonumber(ARGV[3]))
return 1
"#;

/// Value stored under `price:{venue}:{pair}` and as members of `price_history:{venue}:{pair}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPrice {
    pub price: f64,
    pub liquidity: f64,
    pub timestamp: i64,
}

impl From<&PricePoint> for CachedPrice {
    fn from(point: &PricePoint) -> Self {
        Self {
            price: point.price,
            liquidity: point.liquidity,
            timestamp: point.observed_at,
        }
    }
}

/// A shared Redis cache client.
/// Uses a `ConnectionManager` for automatic reconnection after startup.
#[derive(Clone)]
pub struct Cache {
    conn_manager: ConnectionManager,
    default_ttl_secs: i64,
    redis_url: String,
    store_if_newer: Script,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("redis_url", &self.redis_url)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("conn_manager", &"<ConnectionManager instance>")
            .finish()
    }
}

impl Cache {
    /// Connects to Redis. Fails if the server cannot be reached right now.
    pub async fn new(redis_url: &str, default_ttl_secs: i64) -> Result<Self, ArbError> {
        info!("Initializing Redis connection manager for URL: {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            ArbError::CacheError(format!("Failed to create Redis ConnectionManager: {}", e))
        })?;
        info!("Redis ConnectionManager initialized successfully. TTL: {}s", default_ttl_secs);
        Ok(Self {
            conn_manager,
            default_ttl_secs,
            redis_url: redis_url.to_string(),
            store_if_newer: Script::new(STORE_IF_NEWER_LUA),
        })
    }

    pub fn generate_key(prefix: &str, params: &[&str]) -> String {
        let mut key = prefix.to_string();
        for param in params {
            key.push(':');
            key.push_str(param);
        }
        key
    }

    fn latest_key(venue: &str, pair: &str) -> String {
        Self::generate_key("price", &[venue, pair])
    }

    fn history_key(venue: &str, pair: &str) -> String {
        Self::generate_key("price_history", &[venue, pair])
    }

    /// Writes the latest slot for the point's key unless a newer value is
    /// already cached. Returns whether the slot was written.
    pub async fn store_latest(&self, point: &PricePoint) -> Result<bool, ArbError> {
        let key = Self::latest_key(&point.venue, &point.pair.key());
        let value = serde_json::to_string(&CachedPrice::from(point))?;
        let mut conn = self.conn_manager.clone();
        let written: i32 = self
            .store_if_newer
            .key(&key)
            .arg(value)
            .arg(point.observed_at)
            .arg(self.default_ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!("Redis latest-slot write failed for {}: {}", key, e);
                ArbError::from(e)
            })?;
        if written == 0 {
            debug!("Cache kept newer value for {} (incoming ts {})", key, point.observed_at);
        }
        Ok(written == 1)
    }

    /// Adds the point to the key's history and prunes entries older than
    /// `now - ttl`.
    pub async fn append_history(&self, point: &PricePoint, now: i64) -> Result<(), ArbError> {
        let key = Self::history_key(&point.venue, &point.pair.key());
        let value = serde_json::to_string(&CachedPrice::from(point))?;
        let cutoff = now - self.default_ttl_secs;
        let mut conn = self.conn_manager.clone();
        redis::pipe()
            .atomic()
            .zadd(&key, value, point.observed_at)
            .ignore()
            .zrembyscore(&key, "-inf", format!("({}", cutoff))
            .ignore()
            .expire(&key, self.default_ttl_secs)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Redis history append failed for {}: {}", key, e);
                ArbError::from(e)
            })
    }

    pub async fn get_latest(&self, venue: &str, pair: &str) -> Result<Option<CachedPrice>, ArbError> {
        let key = Self::latest_key(venue, pair);
        let mut conn = self.conn_manager.clone();
        match conn.get::<_, Option<String>>(&key).await? {
            Some(raw) => {
                debug!("Cache HIT for key: {}", key);
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                Ok(None)
            }
        }
    }

    /// History entries with `from <= timestamp <= to`, ascending by timestamp.
    pub async fn get_history(
        &self,
        venue: &str,
        pair: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<CachedPrice>, ArbError> {
        let key = Self::history_key(venue, pair);
        let mut conn = self.conn_manager.clone();
        let raw: Vec<String> = conn.zrangebyscore(&key, from, to).await?;
        let mut entries = Vec::with_capacity(raw.len());
        for member in raw {
            match serde_json::from_str::<CachedPrice>(&member) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed history member in {}: {}", key, e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TokenPair;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_layout() {
        assert_eq!(Cache::latest_key("binance", "WETH/USDT"), "price:binance:WETH/USDT");
        assert_eq!(
            Cache::history_key("binance", "WETH/USDT"),
            "price_history:binance:WETH/USDT"
        );
    }

    #[test]
    fn test_cached_price_json_shape() {
        let point = PricePoint::new("binance", &TokenPair::new("WETH", "USDT"), 2500.5, 0.0, 1700000000);
        let json = serde_json::to_value(CachedPrice::from(&point)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "price": 2500.5, "liquidity": 0.0, "timestamp": 1700000000 })
        );
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server (REDIS_URL)"]
    async fn test_latest_slot_keeps_newest_timestamp() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into());
        let cache = Cache::new(&url, 3600).await.unwrap();
        let pair = TokenPair::new("TEST", "LWW");
        let now = crate::utils::now_unix();

        assert!(cache.store_latest(&PricePoint::new("lww", &pair, 1.0, 1.0, now)).await.unwrap());
        assert!(!cache.store_latest(&PricePoint::new("lww", &pair, 2.0, 1.0, now - 50)).await.unwrap());

        let latest = cache.get_latest("lww", &pair.key()).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, now);
        assert_eq!(latest.price, 1.0);
    }
}
