//! Configuration loading and validation.
//!
//! Every key has a default; validation only rejects values that would make
//! the rule set meaningless.

use crate::domain::error::StrongscanError;
use crate::domain::exclusion::ExclusionPolicy;
use crate::domain::instrument::CellParser;
use crate::domain::market_table::ColumnLabels;
use crate::domain::screen::ScreenConfig;
use crate::domain::strength::StrengthRules;
use crate::domain::universe::UniverseConfig;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StrongscanError {
    StrongscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, StrongscanError> {
    let value = config.get_int(section, key, default as i64)?;
    usize::try_from(value).map_err(|_| invalid(section, key, format!("{key} must be non-negative")))
}

fn get_windows(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &[usize],
) -> Result<Vec<usize>, StrongscanError> {
    match config.get_list(section, key) {
        None => Ok(default.to_vec()),
        Some(items) => items
            .iter()
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| invalid(section, key, format!("'{s}' is not a window length")))
            })
            .collect(),
    }
}

pub fn build_universe_config(config: &dyn ConfigPort) -> Result<UniverseConfig, StrongscanError> {
    let defaults = UniverseConfig::default();
    let label = |key: &str, default: &str| {
        config
            .get_string("universe", key)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    let labels = ColumnLabels {
        code: label("code_label", &defaults.labels.code),
        name: label("name_label", &defaults.labels.name),
        volume: label("volume_label", &defaults.labels.volume),
        close: label("close_label", &defaults.labels.close),
    };
    let parser = CellParser::new(label("no_trade_token", &defaults.parser.no_trade_token));
    let exclusion = match config.get_list("exclusion", "keywords") {
        Some(keywords) => ExclusionPolicy::from_keywords(keywords),
        None => defaults.exclusion,
    };

    Ok(UniverseConfig {
        top_n: get_usize(config, "universe", "top_n", defaults.top_n)?,
        labels,
        parser,
        exclusion,
    })
}

pub fn build_strength_rules(config: &dyn ConfigPort) -> Result<StrengthRules, StrongscanError> {
    let d = StrengthRules::default();
    Ok(StrengthRules {
        ma_windows: get_windows(config, "rules", "ma_windows", &d.ma_windows)?,
        price_ma_window: get_usize(config, "rules", "price_ma_window", d.price_ma_window)?,
        volume_ma_window: get_usize(config, "rules", "volume_ma_window", d.volume_ma_window)?,
        min_bars: get_usize(config, "rules", "min_bars", d.min_bars)?,
        rising_volume_bars: get_usize(config, "rules", "rising_volume_bars", d.rising_volume_bars)?,
        volume_surge_multiplier: config.get_double(
            "rules",
            "volume_surge_multiplier",
            d.volume_surge_multiplier,
        )?,
        high_lookback: get_usize(config, "rules", "high_lookback", d.high_lookback)?,
        near_high_ratio: config.get_double("rules", "near_high_ratio", d.near_high_ratio)?,
        min_pct_change: config.get_double("rules", "min_pct_change", d.min_pct_change)?,
    })
}

/// Build the full run configuration from `config`, then validate it.
pub fn build_screen_config(config: &dyn ConfigPort) -> Result<ScreenConfig, StrongscanError> {
    let d = ScreenConfig::default();
    let lookback = config.get_int("history", "lookback_days", d.lookback_days as i64)?;
    let pacing = config.get_int("history", "pacing_ms", d.pacing_ms as i64)?;

    let screen = ScreenConfig {
        universe: build_universe_config(config)?,
        rules: build_strength_rules(config)?,
        lookback_days: u32::try_from(lookback)
            .map_err(|_| invalid("history", "lookback_days", "lookback_days must be non-negative"))?,
        symbol_suffix: config
            .get_string("history", "symbol_suffix")
            .unwrap_or(d.symbol_suffix),
        pacing_ms: u64::try_from(pacing)
            .map_err(|_| invalid("history", "pacing_ms", "pacing_ms must be non-negative"))?,
        workdir: config
            .get_string("output", "workdir")
            .map(PathBuf::from)
            .unwrap_or(d.workdir),
        max_charts: get_usize(config, "output", "max_charts", d.max_charts)?,
    };

    validate_screen_config(&screen)?;
    Ok(screen)
}

pub fn validate_screen_config(config: &ScreenConfig) -> Result<(), StrongscanError> {
    validate_top_n(config)?;
    validate_lookback(config)?;
    validate_rules(&config.rules)?;
    Ok(())
}

fn validate_top_n(config: &ScreenConfig) -> Result<(), StrongscanError> {
    if config.universe.top_n == 0 {
        return Err(invalid("universe", "top_n", "top_n must be at least 1"));
    }
    Ok(())
}

fn validate_lookback(config: &ScreenConfig) -> Result<(), StrongscanError> {
    if config.lookback_days == 0 {
        return Err(invalid(
            "history",
            "lookback_days",
            "lookback_days must be at least 1",
        ));
    }
    Ok(())
}

pub fn validate_rules(rules: &StrengthRules) -> Result<(), StrongscanError> {
    if rules.ma_windows.iter().any(|&w| w == 0) {
        return Err(invalid("rules", "ma_windows", "windows must be at least 1"));
    }
    if rules.price_ma_window == 0 {
        return Err(invalid(
            "rules",
            "price_ma_window",
            "price_ma_window must be at least 1",
        ));
    }
    if rules.volume_ma_window == 0 {
        return Err(invalid(
            "rules",
            "volume_ma_window",
            "volume_ma_window must be at least 1",
        ));
    }
    if rules.min_bars < 2 {
        return Err(invalid("rules", "min_bars", "min_bars must be at least 2"));
    }
    if rules.rising_volume_bars < 2 {
        return Err(invalid(
            "rules",
            "rising_volume_bars",
            "rising_volume_bars must be at least 2",
        ));
    }
    if rules.high_lookback == 0 {
        return Err(invalid(
            "rules",
            "high_lookback",
            "high_lookback must be at least 1",
        ));
    }
    if !(rules.near_high_ratio > 0.0 && rules.near_high_ratio <= 1.0) {
        return Err(invalid(
            "rules",
            "near_high_ratio",
            "near_high_ratio must be in (0, 1]",
        ));
    }
    if !(rules.volume_surge_multiplier >= 0.0) {
        return Err(invalid(
            "rules",
            "volume_surge_multiplier",
            "volume_surge_multiplier must be non-negative",
        ));
    }
    Ok(())
}
