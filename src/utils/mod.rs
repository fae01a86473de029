use crate::error::ArbError;
use chrono::{SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Installs the global `fern` logger: stdout always, plus an append-mode
/// file when `log_file` is set.
pub fn setup_logging(level: log::LevelFilter, log_file: Option<&str>) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn)
        .level_for("redis", log::LevelFilter::Warn)
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    info!("Logging initialized at level {}.", level);
    Ok(())
}

/// Current wall-clock time as unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Cuts `text` to at most `max_chars` characters for log output.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Ordered `(base, quote)` symbol pair. Symbols are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenPair {
    pub base: String,
    pub quote: String,
}

impl TokenPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            quote: quote.trim().to_uppercase(),
        }
    }

    /// Lookup key used by the store and the cooldown ledger: `BASE/QUOTE`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Symbol spelling expected by a given venue's API.
    pub fn venue_symbol(&self, venue_id: &str) -> String {
        match venue_id {
            "binance" => format!("{}{}", self.base, self.quote),
            "coinbase" => format!("{}-{}", self.base, self.quote),
            _ => self.key(),
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TokenPair {
    type Err = ArbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(TokenPair::new(base, quote))
            }
            _ => Err(ArbError::ConfigError(format!(
                "Invalid token pair '{}', expected BASE/QUOTE",
                s
            ))),
        }
    }
}

/// One observed price sample. `price` is quote units per one base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub venue: String,
    pub pair: TokenPair,
    pub price: f64,
    pub liquidity: f64,
    pub observed_at: i64,
}

impl PricePoint {
    pub fn new(venue: &str, pair: &TokenPair, price: f64, liquidity: f64, observed_at: i64) -> Self {
        Self {
            venue: venue.to_string(),
            pair: pair.clone(),
            price,
            liquidity,
            observed_at,
        }
    }

    /// A copy of this sample stamped with a different observation time.
    pub fn observed(&self, observed_at: i64) -> Self {
        Self {
            observed_at,
            ..self.clone()
        }
    }
}
