//! Per-symbol evaluated data: the usable bars plus every computed indicator.
//!
//! This is what the chart sink receives for a passing instrument.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CodeData {
    pub code: String,
    pub name: String,
    pub bars: Vec<PriceBar>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl CodeData {
    pub fn new(code: String, name: String, bars: Vec<PriceBar>) -> Self {
        Self {
            code,
            name,
            bars,
            indicators: HashMap::new(),
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn indicator(&self, indicator_type: IndicatorType) -> Option<&IndicatorSeries> {
        self.indicators.get(&indicator_type)
    }

    /// Close-price moving averages in ascending window order.
    pub fn price_averages(&self) -> Vec<&IndicatorSeries> {
        let mut series: Vec<&IndicatorSeries> = self
            .indicators
            .values()
            .filter(|s| matches!(s.indicator_type, IndicatorType::Sma(_)))
            .collect();
        series.sort_by_key(|s| s.indicator_type.period());
        series
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.bars.first()?.date, self.bars.last()?.date))
    }
}
