//! Shared helpers for computing a set of indicators over one series.

use crate::domain::indicator::sma::{calculate_sma, calculate_volume_sma};
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use std::collections::HashMap;

pub fn calculate_indicator(bars: &[PriceBar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::VolumeSma(period) => calculate_volume_sma(bars, period),
    }
}

/// Compute every requested indicator once; duplicates collapse.
pub fn compute_indicators(
    bars: &[PriceBar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(types.len());
    for &t in types {
        out.entry(t).or_insert_with(|| calculate_indicator(bars, t));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(n: usize) -> Vec<PriceBar> {
        (0..n)
            .map(|i| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: None,
                high: None,
                low: None,
                close: Some(100.0 + i as f64),
                volume: Some(1000.0 * (i + 1) as f64),
            })
            .collect()
    }

    #[test]
    fn computes_each_requested_type() {
        let bars = make_bars(10);
        let types = [
            IndicatorType::Sma(3),
            IndicatorType::Sma(5),
            IndicatorType::VolumeSma(5),
        ];
        let map = compute_indicators(&bars, &types);

        assert_eq!(map.len(), 3);
        for t in types {
            assert_eq!(map[&t].values.len(), 10);
            assert_eq!(map[&t].indicator_type, t);
        }
    }

    #[test]
    fn duplicate_types_collapse() {
        let bars = make_bars(4);
        let map = compute_indicators(&bars, &[IndicatorType::Sma(3), IndicatorType::Sma(3)]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn dispatch_matches_direct_call() {
        let bars = make_bars(6);
        let direct = calculate_volume_sma(&bars, 5);
        let dispatched = calculate_indicator(&bars, IndicatorType::VolumeSma(5));
        assert_eq!(direct.values, dispatched.values);
    }
}
