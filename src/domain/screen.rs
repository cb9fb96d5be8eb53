//! Run orchestration: snapshot → universe → per-symbol verdicts → notify.
//!
//! Only snapshot fetch and schema failures abort a run; they are announced
//! with a single notification before returning. Everything after the
//! universe is built degrades per symbol or per side effect.

use crate::domain::error::StrongscanError;
use crate::domain::instrument::Instrument;
use crate::domain::pacing::Pacer;
use crate::domain::strength::{StrengthEvaluator, StrengthRules, Verdict};
use crate::domain::universe::{Universe, UniverseBuilder, UniverseConfig};
use crate::ports::artifact_port::{ArtifactPort, Table};
use crate::ports::history_port::HistoryPort;
use crate::ports::notify_port::{Delivery, NotifyPort};
use crate::ports::snapshot_port::SnapshotPort;
use chrono::Local;
use std::path::{Path, PathBuf};

pub const UNIVERSE_CSV: &str = "top_volume_stocks.csv";
pub const CANDIDATES_CSV: &str = "strong_stocks.csv";
pub const CHARTS_DIR: &str = "charts";

#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub universe: UniverseConfig,
    pub rules: StrengthRules,
    pub lookback_days: u32,
    /// Appended to the exchange code to form the history provider symbol.
    pub symbol_suffix: String,
    pub pacing_ms: u64,
    pub workdir: PathBuf,
    /// Upper bound on chart attachments per run.
    pub max_charts: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            rules: StrengthRules::default(),
            lookback_days: 120,
            symbol_suffix: ".TW".to_string(),
            pacing_ms: 600,
            workdir: PathBuf::from("strong_output"),
            max_charts: 5,
        }
    }
}

impl ScreenConfig {
    pub fn history_symbol(&self, code: &str) -> String {
        format!("{}{}", code, self.symbol_suffix)
    }

    pub fn universe_csv_path(&self) -> PathBuf {
        self.workdir.join(UNIVERSE_CSV)
    }

    pub fn candidates_csv_path(&self) -> PathBuf {
        self.workdir.join(CANDIDATES_CSV)
    }

    pub fn chart_path(&self, code: &str, name: &str) -> PathBuf {
        self.workdir
            .join(CHARTS_DIR)
            .join(format!("{}_{}.svg", code, name.replace('/', "_")))
    }
}

pub struct ScreenPorts<'a> {
    pub snapshot: &'a dyn SnapshotPort,
    pub history: &'a dyn HistoryPort,
    pub notifier: &'a dyn NotifyPort,
    pub artifacts: &'a dyn ArtifactPort,
}

#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub instrument: Instrument,
    pub verdict: Verdict,
    pub chart: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ScreenReport {
    pub universe: Universe,
    pub outcomes: Vec<SymbolOutcome>,
    pub charts_sent: usize,
}

impl ScreenReport {
    pub fn candidates(&self) -> impl Iterator<Item = &SymbolOutcome> {
        self.outcomes.iter().filter(|o| o.verdict.passed)
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates().count()
    }
}

pub struct Screener<'a> {
    ports: ScreenPorts<'a>,
    config: &'a ScreenConfig,
    evaluator: StrengthEvaluator,
}

impl<'a> Screener<'a> {
    pub fn new(ports: ScreenPorts<'a>, config: &'a ScreenConfig) -> Self {
        Self {
            ports,
            config,
            evaluator: StrengthEvaluator::new(config.rules.clone()),
        }
    }

    /// Full run. Returns `Err` only for fatal snapshot failures, after the
    /// failure has been announced.
    pub fn run(&self, pacer: &mut dyn Pacer) -> Result<ScreenReport, StrongscanError> {
        let started = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.notify(&format!("{} starting strong stock screen...", started));

        let universe = self.build_universe()?;
        self.write_table(&universe_table(&universe), &self.config.universe_csv_path());
        self.notify(&format!(
            "Selected top {} by volume (excluding ETF/financial/DR): {} instruments",
            self.config.universe.top_n,
            universe.count()
        ));

        let outcomes = self.evaluate_all(&universe.instruments, pacer, true);
        let charts_sent = self.announce(&outcomes);

        let candidates = candidates_table(&outcomes);
        if !candidates.is_empty() {
            self.write_table(&candidates, &self.config.candidates_csv_path());
        }

        Ok(ScreenReport {
            universe,
            outcomes,
            charts_sent,
        })
    }

    /// Fetch and normalise the snapshot, announcing any fatal failure.
    pub fn build_universe(&self) -> Result<Universe, StrongscanError> {
        let payload = match self.ports.snapshot.fetch_snapshot() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "snapshot fetch failed");
                self.notify(&format!("Snapshot fetch failed: {}", e));
                return Err(e);
            }
        };

        let builder = UniverseBuilder::new(self.config.universe.clone());
        match builder.build(&payload) {
            Ok(build) => {
                let stats = build.stats;
                tracing::info!(
                    raw_rows = stats.raw_rows,
                    excluded = stats.excluded,
                    missing_identity = stats.missing_identity,
                    truncated = stats.truncated,
                    size = build.universe.count(),
                    "universe built"
                );
                Ok(build.universe)
            }
            Err(e) => {
                tracing::error!(error = %e, "snapshot parse failed");
                self.notify(&format!("Snapshot parse failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Evaluate instruments one at a time in order. A failure on one
    /// instrument never affects the next.
    pub fn evaluate_all(
        &self,
        instruments: &[Instrument],
        pacer: &mut dyn Pacer,
        render_charts: bool,
    ) -> Vec<SymbolOutcome> {
        let total = instruments.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, instrument) in instruments.iter().enumerate() {
            pacer.pace();
            let outcome = self.evaluate_one(instrument, pacer, render_charts);

            if outcome.verdict.passed {
                tracing::info!(
                    index = i + 1,
                    total,
                    code = %instrument.code,
                    name = %instrument.name,
                    "passed"
                );
            } else {
                tracing::info!(
                    index = i + 1,
                    total,
                    code = %instrument.code,
                    name = %instrument.name,
                    reason = %outcome.verdict.reason,
                    "rejected"
                );
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    fn evaluate_one(
        &self,
        instrument: &Instrument,
        pacer: &mut dyn Pacer,
        render_charts: bool,
    ) -> SymbolOutcome {
        let symbol = self.config.history_symbol(&instrument.code);
        let fetched = self
            .ports
            .history
            .fetch_history(&symbol, self.config.lookback_days);
        pacer.record_call();
        let evaluation = match fetched {
            Ok(series) => self
                .evaluator
                .evaluate(&instrument.code, &instrument.name, &series),
            Err(e) => {
                return SymbolOutcome {
                    instrument: instrument.clone(),
                    verdict: Verdict::error(e),
                    chart: None,
                };
            }
        };

        let chart = match (&evaluation.data, evaluation.verdict.passed && render_charts) {
            (Some(data), true) => {
                let path = self.config.chart_path(&instrument.code, &instrument.name);
                match self.ports.artifacts.write_image(data, &path) {
                    Ok(()) => Some(path),
                    Err(e) => {
                        tracing::warn!(code = %instrument.code, error = %e, "chart failed");
                        None
                    }
                }
            }
            _ => None,
        };

        SymbolOutcome {
            instrument: instrument.clone(),
            verdict: evaluation.verdict,
            chart,
        }
    }

    /// Send the result notification and up to `max_charts` charts. Returns
    /// how many charts were delivered.
    fn announce(&self, outcomes: &[SymbolOutcome]) -> usize {
        let passed: Vec<&SymbolOutcome> = outcomes.iter().filter(|o| o.verdict.passed).collect();
        if passed.is_empty() {
            self.notify("No stocks met the strength criteria today.");
            return 0;
        }

        self.notify(&candidate_message(&passed));

        let mut sent = 0;
        for path in passed
            .iter()
            .filter_map(|o| o.chart.as_deref())
            .take(self.config.max_charts)
        {
            if self.send_photo(path) == Some(Delivery::Sent) {
                sent += 1;
            }
        }
        sent
    }

    fn notify(&self, message: &str) -> Option<Delivery> {
        match self.ports.notifier.send_text(message) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(error = %e, "text notification failed");
                None
            }
        }
    }

    fn send_photo(&self, path: &Path) -> Option<Delivery> {
        match self.ports.notifier.send_photo(path) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "photo notification failed");
                None
            }
        }
    }

    fn write_table(&self, table: &Table, path: &Path) {
        if let Err(e) = self.ports.artifacts.write_table(table, path) {
            tracing::warn!(path = %path.display(), error = %e, "table write failed");
        }
    }
}

pub fn candidate_message(passed: &[&SymbolOutcome]) -> String {
    let lines: Vec<String> = passed
        .iter()
        .map(|o| format!("{} {}", o.instrument.code, o.instrument.name))
        .collect();
    format!("Strong stocks:\n{}", lines.join("\n"))
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

pub fn universe_table(universe: &Universe) -> Table {
    let mut table = Table::new(["code", "name", "volume_shares", "close_price", "volume_lots"]);
    for i in &universe.instruments {
        table.push_row(vec![
            i.code.clone(),
            i.name.clone(),
            format_number(i.volume_shares),
            format_number(i.close_price),
            format_number(i.volume_lots),
        ]);
    }
    table
}

pub fn candidates_table(outcomes: &[SymbolOutcome]) -> Table {
    let mut table = Table::new(["symbol", "name", "reason"]);
    for o in outcomes.iter().filter(|o| o.verdict.passed) {
        table.push_row(vec![
            o.instrument.code.clone(),
            o.instrument.name.clone(),
            o.verdict.reason.to_string(),
        ]);
    }
    table
}
