//! SQLite store of record for price samples and detected opportunities.
//!
//! `rusqlite` is blocking, so every call runs on tokio's blocking pool and the
//! polling loops never wait on disk I/O from a runtime worker thread.

use crate::arbitrage::opportunity::ArbitrageOpportunity;
use crate::error::{ArbError, Result};
use crate::utils::{PricePoint, TokenPair};
use log::{debug, info};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exchange TEXT NOT NULL,
    pair TEXT NOT NULL,
    price REAL NOT NULL,
    liquidity REAL,
    timestamp INTEGER NOT NULL,
    UNIQUE(exchange, pair, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_prices_lookup
    ON prices(exchange, pair, timestamp);

CREATE TABLE IF NOT EXISTS arbitrage_opportunities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pair TEXT NOT NULL,
    buy_exchange TEXT NOT NULL,
    sell_exchange TEXT NOT NULL,
    buy_price REAL NOT NULL,
    sell_price REAL NOT NULL,
    price_diff_percent REAL NOT NULL,
    fees_percent REAL NOT NULL,
    slippage_percent REAL NOT NULL,
    net_profit_percent REAL NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_opportunities_recent
    ON arbitrage_opportunities(timestamp DESC);
"#;

#[derive(Clone)]
pub struct DurableLog {
    conn: Arc<Mutex<Connection>>,
}

impl DurableLog {
    /// Opens (creating if needed) the database at `db_path` and applies the schema.
    /// `":memory:"` gives a private in-memory database.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ArbError::DatabaseError(format!("Cannot create {}: {}", parent.display(), e))
                    })?;
                }
            }
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )?
        };
        conn.execute_batch(SCHEMA_SQL)?;
        info!("Durable log ready at {}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ArbError::DatabaseError("durable log mutex poisoned".into()))?;
            op(&guard)
        })
        .await?
    }

    /// Stores a price sample. Re-inserting the same `(exchange, pair, timestamp)`
    /// replaces the row instead of adding another one.
    pub async fn insert_price(&self, point: &PricePoint) -> Result<()> {
        let point = point.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO prices (exchange, pair, price, liquidity, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![point.venue, point.pair.key(), point.price, point.liquidity, point.observed_at],
            )?;
            debug!("Durable log stored {} {} @ {}", point.venue, point.pair, point.observed_at);
            Ok(())
        })
        .await
    }

    /// Samples for `(venue, pair)` with `from <= timestamp <= to`, ascending.
    pub async fn price_history(&self, venue: &str, pair: &TokenPair, from: i64, to: i64) -> Result<Vec<PricePoint>> {
        let venue = venue.to_string();
        let pair = pair.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT price, liquidity, timestamp FROM prices
                 WHERE exchange = ?1 AND pair = ?2 AND timestamp BETWEEN ?3 AND ?4
                 ORDER BY timestamp ASC",
            )?;
            let rows = stmt.query_map(params![venue, pair.key(), from, to], |row| {
                Ok(PricePoint::new(
                    &venue,
                    &pair,
                    row.get(0)?,
                    row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    row.get(2)?,
                ))
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    pub async fn price_count(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?))
            .await
    }

    pub async fn insert_opportunity(&self, opp: &ArbitrageOpportunity) -> Result<()> {
        let opp = opp.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO arbitrage_opportunities (
                    pair, buy_exchange, sell_exchange, buy_price, sell_price,
                    price_diff_percent, fees_percent, slippage_percent, net_profit_percent, timestamp
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    opp.pair.key(),
                    opp.buy_venue,
                    opp.sell_venue,
                    opp.buy_price,
                    opp.sell_price,
                    opp.price_diff_pct,
                    opp.fees_pct,
                    opp.slippage_pct,
                    opp.net_profit_pct,
                    opp.detected_at
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent opportunities first.
    pub async fn recent_opportunities(&self, limit: usize) -> Result<Vec<ArbitrageOpportunity>> {
        let limit = limit as i64;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT pair, buy_exchange, sell_exchange, buy_price, sell_price,
                        price_diff_percent, fees_percent, slippage_percent, net_profit_percent, timestamp
                 FROM arbitrage_opportunities
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit], |row| {
                let pair: String = row.get(0)?;
                let (base, quote) = pair.split_once('/').unwrap_or((pair.as_str(), ""));
                Ok(ArbitrageOpportunity {
                    pair: TokenPair::new(base, quote),
                    buy_venue: row.get(1)?,
                    sell_venue: row.get(2)?,
                    buy_price: row.get(3)?,
                    sell_price: row.get(4)?,
                    price_diff_pct: row.get(5)?,
                    fees_pct: row.get(6)?,
                    slippage_pct: row.get(7)?,
                    net_profit_pct: row.get(8)?,
                    detected_at: row.get(9)?,
                })
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }
}
