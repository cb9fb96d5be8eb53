//! Daily price bars and the per-symbol series the history provider returns.

use chrono::NaiveDate;

/// One trading day. Fields are optional because providers leave gaps
/// (halted days, partial rows); the evaluator only needs close and volume.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceBar {
    /// Volume as a float, NaN when the cell is missing so that rolling
    /// windows touching it stay undefined.
    pub fn volume_or_nan(&self) -> f64 {
        self.volume.unwrap_or(f64::NAN)
    }

    pub fn has_close(&self) -> bool {
        self.close.is_some_and(|c| !c.is_nan())
    }
}

/// Date-ascending bars for one symbol plus which columns the provider
/// actually delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub has_close: bool,
    pub has_volume: bool,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            bars,
            has_close: true,
            has_volume: true,
        }
    }

    /// A symbol with no listing history.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Bars with a usable close, in date order.
    pub fn valid_close_bars(&self) -> Vec<PriceBar> {
        self.bars.iter().filter(|b| b.has_close()).cloned().collect()
    }
}
