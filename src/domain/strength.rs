//! Strength evaluator: five technical conditions on the latest bar.
//!
//! Every condition must hold for a pass. When the series cannot be evaluated
//! the verdict carries a short skip reason instead of the condition
//! breakdown.

use crate::domain::code_data::CodeData;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::instrument::round_to;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use serde::Serialize;
use std::fmt;

/// Thresholds and windows of the rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthRules {
    /// Close-price moving averages to compute (and chart).
    pub ma_windows: Vec<usize>,
    /// Window of the average today's close must exceed.
    pub price_ma_window: usize,
    /// Window of the volume average yesterday's volume is compared to.
    pub volume_ma_window: usize,
    pub min_bars: usize,
    pub rising_volume_bars: usize,
    pub volume_surge_multiplier: f64,
    pub high_lookback: usize,
    pub near_high_ratio: f64,
    /// Day-over-day gain in percent that must be exceeded.
    pub min_pct_change: f64,
}

impl Default for StrengthRules {
    fn default() -> Self {
        Self {
            ma_windows: vec![3, 5, 8, 20, 60],
            price_ma_window: 5,
            volume_ma_window: 5,
            min_bars: 10,
            rising_volume_bars: 3,
            volume_surge_multiplier: 2.0,
            high_lookback: 10,
            near_high_ratio: 0.95,
            min_pct_change: 3.0,
        }
    }
}

impl StrengthRules {
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types: Vec<IndicatorType> =
            self.ma_windows.iter().map(|&w| IndicatorType::Sma(w)).collect();
        if !self.ma_windows.contains(&self.price_ma_window) {
            types.push(IndicatorType::Sma(self.price_ma_window));
        }
        types.push(IndicatorType::VolumeSma(self.volume_ma_window));
        types
    }
}

/// Per-condition breakdown of a completed evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionSet {
    pub vols_up: bool,
    pub yesterday_vs_ma5: bool,
    pub close_above_ma5: bool,
    pub close_new10: bool,
    pub pct_ok: bool,
    /// Day-over-day change in percent, rounded to 2 places.
    pub pct: f64,
}

impl ConditionSet {
    pub fn all_hold(&self) -> bool {
        self.vols_up
            && self.yesterday_vs_ma5
            && self.close_above_ma5
            && self.close_new10
            && self.pct_ok
    }
}

/// Why a symbol could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    NoVolume,
    ShortHistory,
    Error(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => f.write_str("no-data"),
            SkipReason::NoVolume => f.write_str("no-volume"),
            SkipReason::ShortHistory => f.write_str("short-history"),
            SkipReason::Error(msg) => write!(f, "error:{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerdictReason {
    Conditions(ConditionSet),
    Skipped(SkipReason),
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictReason::Skipped(reason) => reason.fmt(f),
            VerdictReason::Conditions(c) => match serde_json::to_string(c) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{:?}", c),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            passed: false,
            reason: VerdictReason::Skipped(reason),
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self::skipped(SkipReason::Error(message.to_string()))
    }

    pub fn from_conditions(conditions: ConditionSet) -> Self {
        Self {
            passed: conditions.all_hold(),
            reason: VerdictReason::Conditions(conditions),
        }
    }

    pub fn conditions(&self) -> Option<&ConditionSet> {
        match &self.reason {
            VerdictReason::Conditions(c) => Some(c),
            VerdictReason::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.reason {
            VerdictReason::Skipped(r) => Some(r),
            VerdictReason::Conditions(_) => None,
        }
    }
}

/// Verdict plus the computed series, when indicators were computed.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub data: Option<CodeData>,
}

impl Evaluation {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            verdict: Verdict::skipped(reason),
            data: None,
        }
    }
}

pub struct StrengthEvaluator {
    rules: StrengthRules,
}

impl StrengthEvaluator {
    pub fn new(rules: StrengthRules) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, code: &str, name: &str, series: &PriceSeries) -> Evaluation {
        if series.is_empty() || !series.has_close {
            return Evaluation::skipped(SkipReason::NoData);
        }
        let bars = series.valid_close_bars();
        if !series.has_volume {
            return Evaluation::skipped(SkipReason::NoVolume);
        }

        let mut data = CodeData::new(code.to_string(), name.to_string(), bars);
        data.indicators = compute_indicators(&data.bars, &self.rules.indicator_types());

        if data.bar_count() < self.rules.min_bars {
            return Evaluation {
                verdict: Verdict::skipped(SkipReason::ShortHistory),
                data: Some(data),
            };
        }

        let conditions = self.conditions(&data);
        Evaluation {
            verdict: Verdict::from_conditions(conditions),
            data: Some(data),
        }
    }

    /// Requires at least two bars with a close.
    fn conditions(&self, data: &CodeData) -> ConditionSet {
        let rules = &self.rules;
        let bars = &data.bars;
        let n = bars.len();
        let close_of = |b: &PriceBar| b.close.unwrap_or(f64::NAN);
        let close_today = close_of(&bars[n - 1]);
        let close_prev = close_of(&bars[n - 2]);

        let vols_up = n >= rules.rising_volume_bars
            && bars[n - rules.rising_volume_bars..]
                .windows(2)
                .all(|w| w[0].volume_or_nan() < w[1].volume_or_nan());

        let yesterday_vs_ma5 = data
            .indicator(IndicatorType::VolumeSma(rules.volume_ma_window))
            .and_then(|s| s.from_end(2))
            .is_some_and(|ma| bars[n - 2].volume_or_nan() > ma * rules.volume_surge_multiplier);

        let close_above_ma5 = data
            .indicator(IndicatorType::Sma(rules.price_ma_window))
            .and_then(|s| s.from_end(1))
            .is_some_and(|ma| close_today > ma);

        let lookback = rules.high_lookback.min(n);
        let recent_high = bars[n - lookback..]
            .iter()
            .map(close_of)
            .fold(f64::NEG_INFINITY, f64::max);
        let close_new10 =
            close_today >= recent_high || close_today >= recent_high * rules.near_high_ratio;

        let pct = (close_today - close_prev) / close_prev * 100.0;
        let pct_ok = pct > rules.min_pct_change;

        ConditionSet {
            vols_up,
            yesterday_vs_ma5,
            close_above_ma5,
            close_new10,
            pct_ok,
            pct: round_to(pct, 2),
        }
    }
}
