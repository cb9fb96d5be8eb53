#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use strongscan::domain::code_data::CodeData;
use strongscan::domain::error::StrongscanError;
pub use strongscan::domain::ohlcv::{PriceBar, PriceSeries};
use strongscan::domain::pacing::Pacer;
use strongscan::ports::artifact_port::{ArtifactPort, Table};
use strongscan::ports::history_port::HistoryPort;
use strongscan::ports::notify_port::{Delivery, NotifyPort};
use strongscan::ports::snapshot_port::SnapshotPort;

pub const FIELDS: [&str; 4] = ["證券代號", "證券名稱", "成交股數", "收盤價"];

/// Snapshot payload in the direct `fields`/`data` shape.
pub fn snapshot(rows: &[(&str, &str, &str, &str)]) -> Value {
    let data: Vec<Value> = rows
        .iter()
        .map(|(code, name, volume, close)| json!([code, name, volume, close]))
        .collect();
    json!({ "stat": "OK", "fields": FIELDS, "data": data })
}

pub enum MockSnapshotPort {
    Payload(Value),
    Failing(String),
}

impl SnapshotPort for MockSnapshotPort {
    fn fetch_snapshot(&self) -> Result<Value, StrongscanError> {
        match self {
            MockSnapshotPort::Payload(v) => Ok(v.clone()),
            MockSnapshotPort::Failing(reason) => Err(StrongscanError::fetch("twse", reason)),
        }
    }
}

pub struct MockHistoryPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl MockHistoryPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl HistoryPort for MockHistoryPort {
    fn fetch_history(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<PriceSeries, StrongscanError> {
        self.calls.borrow_mut().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StrongscanError::fetch("yahoo", reason));
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| PriceSeries::empty(symbol)))
    }
}

/// History port that takes `delay` per call and records when each call
/// started and finished.
pub struct SlowHistoryPort {
    pub delay: Duration,
    pub spans: RefCell<Vec<(Instant, Instant)>>,
}

impl SlowHistoryPort {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            spans: RefCell::new(Vec::new()),
        }
    }

    /// Time between the end of each call and the start of the next.
    pub fn gaps(&self) -> Vec<Duration> {
        self.spans
            .borrow()
            .windows(2)
            .map(|w| w[1].0.saturating_duration_since(w[0].1))
            .collect()
    }
}

impl HistoryPort for SlowHistoryPort {
    fn fetch_history(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<PriceSeries, StrongscanError> {
        let start = Instant::now();
        std::thread::sleep(self.delay);
        self.spans.borrow_mut().push((start, Instant::now()));
        Ok(PriceSeries::empty(symbol))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub texts: RefCell<Vec<String>>,
    pub photos: RefCell<Vec<PathBuf>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.borrow().clone()
    }

    pub fn photos(&self) -> Vec<PathBuf> {
        self.photos.borrow().clone()
    }
}

impl NotifyPort for RecordingNotifier {
    fn send_text(&self, message: &str) -> Result<Delivery, StrongscanError> {
        self.texts.borrow_mut().push(message.to_string());
        if self.fail {
            return Err(StrongscanError::Notify {
                reason: "channel down".into(),
            });
        }
        Ok(Delivery::Sent)
    }

    fn send_photo(&self, image_path: &Path) -> Result<Delivery, StrongscanError> {
        self.photos.borrow_mut().push(image_path.to_path_buf());
        if self.fail {
            return Err(StrongscanError::Notify {
                reason: "channel down".into(),
            });
        }
        Ok(Delivery::Sent)
    }
}

#[derive(Default)]
pub struct RecordingArtifacts {
    pub tables: RefCell<Vec<(PathBuf, Table)>>,
    pub images: RefCell<Vec<(PathBuf, String)>>,
    pub fail: bool,
}

impl RecordingArtifacts {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn table_paths(&self) -> Vec<PathBuf> {
        self.tables.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn table(&self, file_name: &str) -> Option<Table> {
        self.tables
            .borrow()
            .iter()
            .find(|(p, _)| p.file_name().is_some_and(|n| n == file_name))
            .map(|(_, t)| t.clone())
    }

    pub fn image_count(&self) -> usize {
        self.images.borrow().len()
    }
}

impl ArtifactPort for RecordingArtifacts {
    fn write_table(&self, table: &Table, path: &Path) -> Result<(), StrongscanError> {
        if self.fail {
            return Err(StrongscanError::Artifact {
                reason: "disk full".into(),
            });
        }
        self.tables
            .borrow_mut()
            .push((path.to_path_buf(), table.clone()));
        Ok(())
    }

    fn write_image(&self, data: &CodeData, path: &Path) -> Result<(), StrongscanError> {
        if self.fail {
            return Err(StrongscanError::Artifact {
                reason: "disk full".into(),
            });
        }
        self.images
            .borrow_mut()
            .push((path.to_path_buf(), data.code.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingPacer {
    pub count: Cell<usize>,
}

impl Pacer for CountingPacer {
    fn pace(&mut self) {
        self.count.set(self.count.get() + 1);
    }
}

pub fn make_bar(day: u32, close: f64, volume: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        open: Some(close),
        high: Some(close),
        low: Some(close),
        close: Some(close),
        volume: Some(volume),
    }
}

pub fn make_series(symbol: &str, closes: &[f64], volumes: &[f64]) -> PriceSeries {
    let bars = closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&c, &v))| make_bar(i as u32 + 1, c, v))
        .collect();
    PriceSeries::new(symbol, bars)
}

/// Flat base, rising volume into a 2x surge yesterday, +4% today at a new high.
pub fn passing_series(symbol: &str) -> PriceSeries {
    make_series(
        symbol,
        &[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 104.0],
        &[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 150.0, 1000.0, 2000.0],
    )
}

/// Same volumes but a flat close: only the gain condition fails.
pub fn flat_series(symbol: &str) -> PriceSeries {
    make_series(
        symbol,
        &[100.0; 10],
        &[100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 100.0, 150.0, 1000.0, 2000.0],
    )
}
