use crate::error::{ArbError, Result};
use crate::utils::{PricePoint, TokenPair};
use serde_json::Value;

/// One pool/pair returned by a venue, normalized to subgraph conventions:
/// `token0_price` is token0 per one token1, `token1_price` is token1 per one token0.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCandidate {
    pub id: String,
    pub token0: String,
    pub token1: String,
    pub token0_price: f64,
    pub token1_price: f64,
    pub liquidity: f64,
}

/// Which side of a candidate pool holds the configured base token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    BaseIsToken0,
    BaseIsToken1,
}

impl PoolCandidate {
    /// Exact, case-insensitive two-sided symbol match against `pair`.
    pub fn orientation(&self, pair: &TokenPair) -> Option<Orientation> {
        let t0 = self.token0.to_uppercase();
        let t1 = self.token1.to_uppercase();
        if t0 == pair.base && t1 == pair.quote {
            Some(Orientation::BaseIsToken0)
        } else if t1 == pair.base && t0 == pair.quote {
            Some(Orientation::BaseIsToken1)
        } else {
            None
        }
    }

    /// Price expressed as quote units per one base unit.
    pub fn quote_per_base(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::BaseIsToken0 => self.token1_price,
            Orientation::BaseIsToken1 => self.token0_price,
        }
    }
}

/// Picks the deepest exactly-matching pool and returns its quote-per-base price.
///
/// Candidates without a usable price or with zero liquidity never qualify. Equal
/// liquidity keeps the earlier candidate, so remote response order breaks ties.
pub fn select_best_pool(
    venue: &str,
    pair: &TokenPair,
    candidates: &[PoolCandidate],
    observed_at: i64,
) -> Option<PricePoint> {
    let mut best: Option<(f64, f64)> = None;
    for candidate in candidates {
        let orientation = match candidate.orientation(pair) {
            Some(o) => o,
            None => continue,
        };
        let price = candidate.quote_per_base(orientation);
        if !(price.is_finite() && price > 0.0) {
            continue;
        }
        if !(candidate.liquidity.is_finite() && candidate.liquidity > 0.0) {
            continue;
        }
        match best {
            Some((_, liquidity)) if candidate.liquidity <= liquidity => {}
            _ => best = Some((price, candidate.liquidity)),
        }
    }
    best.map(|(price, liquidity)| PricePoint::new(venue, pair, price, liquidity, observed_at))
}

/// Reads a numeric field that subgraphs usually encode as a decimal string.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub(crate) fn required_f64(object: &Value, field: &str) -> Result<f64> {
    object
        .get(field)
        .and_then(value_as_f64)
        .ok_or_else(|| ArbError::ParseError(format!("missing or non-numeric field '{}'", field)))
}

pub(crate) fn required_str<'a>(object: &'a Value, path: &[&str]) -> Result<&'a str> {
    let mut cursor = object;
    for key in path {
        cursor = cursor
            .get(*key)
            .ok_or_else(|| ArbError::ParseError(format!("missing field '{}'", path.join("."))))?;
    }
    cursor
        .as_str()
        .ok_or_else(|| ArbError::ParseError(format!("field '{}' is not a string", path.join("."))))
}

pub(crate) fn required_array<'a>(object: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    object
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| ArbError::ParseError(format!("missing array field '{}'", field)))
}

/// Parses a Uniswap-style pool/pair object (`token0 { symbol }`, `token1 { symbol }`,
/// `token0Price`, `token1Price`) using `liquidity_field` as the depth measure.
pub fn candidate_from_subgraph(entry: &Value, liquidity_field: &str) -> Result<PoolCandidate> {
    Ok(PoolCandidate {
        id: entry.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        token0: required_str(entry, &["token0", "symbol"])?.to_string(),
        token1: required_str(entry, &["token1", "symbol"])?.to_string(),
        token0_price: required_f64(entry, "token0Price")?,
        token1_price: required_f64(entry, "token1Price")?,
        liquidity: required_f64(entry, liquidity_field)?,
    })
}
