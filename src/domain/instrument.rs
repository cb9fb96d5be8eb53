//! Canonical instrument rows and the cell coercion used to build them.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// One normalised row of the daily market table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    pub volume_shares: f64,
    /// NaN means the price is unknown, which is distinct from zero.
    pub close_price: f64,
    pub volume_lots: f64,
}

impl Instrument {
    pub fn new(code: String, name: String, volume_shares: f64, close_price: f64) -> Self {
        Self {
            code,
            name,
            volume_shares,
            close_price,
            volume_lots: lots_from_shares(volume_shares),
        }
    }
}

/// Shares per board lot on the exchange.
pub const SHARES_PER_LOT: f64 = 1000.0;

pub fn lots_from_shares(volume_shares: f64) -> f64 {
    round_to(volume_shares / SHARES_PER_LOT, 3)
}

/// Round half-to-even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Numeric cell parser tuned to the provider's formatting.
#[derive(Debug, Clone)]
pub struct CellParser {
    /// Token the provider uses for "no trade" (e.g. `--`).
    pub no_trade_token: String,
}

impl Default for CellParser {
    fn default() -> Self {
        Self {
            no_trade_token: "--".to_string(),
        }
    }
}

impl CellParser {
    pub fn new(no_trade_token: impl Into<String>) -> Self {
        Self {
            no_trade_token: no_trade_token.into(),
        }
    }

    /// Traded share volume. Anything malformed, negative or non-finite is 0.
    pub fn parse_volume(&self, raw: &str) -> f64 {
        let cleaned = self.strip(raw);
        if cleaned.is_empty() || cleaned == self.no_trade_token {
            return 0.0;
        }
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => 0.0,
        }
    }

    /// Closing price. Anything malformed (including the no-trade token) is NaN.
    pub fn parse_price(&self, raw: &str) -> f64 {
        let cleaned = self.strip(raw);
        if cleaned.is_empty() || cleaned == self.no_trade_token {
            return f64::NAN;
        }
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => f64::NAN,
        }
    }

    fn strip(&self, raw: &str) -> String {
        raw.replace(',', "").trim().to_string()
    }
}

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").unwrap());

/// Remove `<...>` markup and surrounding whitespace from a display name.
pub fn clean_name(raw: &str) -> String {
    MARKUP.replace_all(raw, "").trim().to_string()
}
