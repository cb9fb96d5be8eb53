//! Yahoo Finance chart API as the daily history provider.
//!
//! The chart endpoint returns parallel arrays keyed by bar timestamp. Missing
//! cells are `null`, and a column the provider has no data for may be absent
//! altogether; the series records which columns were delivered.

use crate::domain::error::StrongscanError;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::ports::history_port::HistoryPort;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SOURCE: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) strongscan/0.1";

pub struct YahooHistoryAdapter {
    client: Client,
    base_url: String,
}

impl YahooHistoryAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StrongscanError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), symbol)
    }
}

impl HistoryPort for YahooHistoryAdapter {
    fn fetch_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, StrongscanError> {
        let end = Utc::now();
        let start = end - ChronoDuration::days(i64::from(lookback_days));
        let response = self
            .client
            .get(self.chart_url(symbol))
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;

        let status = response.status();
        // 404 carries a JSON body reporting an unknown symbol.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(StrongscanError::fetch(
                SOURCE,
                format!("{symbol}: HTTP {status}"),
            ));
        }
        let body = response
            .text()
            .map_err(|e| StrongscanError::fetch(SOURCE, e.to_string()))?;
        parse_chart(&body, symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

fn cell(column: &Option<Vec<Option<f64>>>, i: usize) -> Option<f64> {
    column.as_ref().and_then(|c| c.get(i).copied().flatten())
}

/// Decode a chart response body. An unknown symbol or a result with no
/// timestamps is an empty series, not an error.
pub fn parse_chart(body: &str, symbol: &str) -> Result<PriceSeries, StrongscanError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| StrongscanError::fetch(SOURCE, format!("{symbol}: invalid chart body: {e}")))?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(PriceSeries::empty(symbol));
        }
        let detail = error.description.unwrap_or_default();
        return Err(StrongscanError::fetch(
            SOURCE,
            format!("{symbol}: {} {}", error.code, detail).trim_end(),
        ));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty(symbol));
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let offset = result.meta.gmtoffset;
    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|d| d.date_naive()) else {
            tracing::debug!(symbol, timestamp = ts, "skipping out-of-range timestamp");
            continue;
        };
        bars.push(PriceBar {
            date,
            open: cell(&quote.open, i),
            high: cell(&quote.high, i),
            low: cell(&quote.low, i),
            close: cell(&quote.close, i),
            volume: cell(&quote.volume, i),
        });
    }

    let mut series = PriceSeries::new(symbol, bars);
    series.has_close = quote.close.is_some();
    series.has_volume = quote.volume.is_some();
    Ok(series)
}
