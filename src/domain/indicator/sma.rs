//! Simple Moving Average over close or volume.
//!
//! SMA(n)[i] = sum(X[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid. A window containing NaN is invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close.unwrap_or(f64::NAN)).collect();
    rolling_mean(bars, &closes, period, IndicatorType::Sma(period))
}

pub fn calculate_volume_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(PriceBar::volume_or_nan).collect();
    rolling_mean(bars, &volumes, period, IndicatorType::VolumeSma(period))
}

fn rolling_mean(
    bars: &[PriceBar],
    inputs: &[f64],
    period: usize,
    indicator_type: IndicatorType,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let mean = if period > 0 && i + 1 >= period {
            let window = &inputs[i + 1 - period..=i];
            window.iter().sum::<f64>() / period as f64
        } else {
            f64::NAN
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid: !mean.is_nan(),
            value: mean,
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
