//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::file_artifact_adapter::FileArtifactAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::telegram_adapter::{TelegramNotifier, TelegramSettings};
use crate::adapters::twse_adapter::{DEFAULT_SNAPSHOT_URL, TwseSnapshotAdapter};
use crate::adapters::yahoo_adapter::{DEFAULT_CHART_URL, YahooHistoryAdapter};
use crate::domain::config_validation::build_screen_config;
use crate::domain::error::StrongscanError;
use crate::domain::instrument::Instrument;
use crate::domain::pacing::{MinIntervalPacer, NoPacing, Pacer};
use crate::domain::screen::{ScreenConfig, ScreenPorts, Screener};
use crate::domain::universe::{Universe, UniverseBuilder};
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::snapshot_port::SnapshotPort;

const DEFAULT_TIMEOUT_SECS: i64 = 20;

#[derive(Parser, Debug)]
#[command(
    name = "strongscan",
    version,
    about = "Daily strong-stock screener for the Taiwan Stock Exchange"
)]
pub struct Cli {
    /// INI configuration file; every key has a default.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Output directory, overriding [output] workdir.
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
    #[arg(long, env = "TELEGRAM_TOKEN", global = true, hide_env_values = true)]
    pub telegram_token: Option<String>,
    #[arg(long, env = "TELEGRAM_CHAT_ID", global = true)]
    pub telegram_chat_id: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full screen and send notifications
    Run {
        #[arg(long)]
        no_pacing: bool,
    },
    /// Build and print the trading universe
    Universe {
        /// Saved snapshot JSON instead of the live endpoint
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Evaluate specific codes and print their verdicts
    Evaluate {
        #[arg(long = "code", required = true, num_args = 1..)]
        codes: Vec<String>,
        #[arg(long)]
        no_pacing: bool,
    },
}

/// Everything a command needs, resolved from the INI file and the CLI.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub screen: ScreenConfig,
    pub snapshot_url: String,
    pub snapshot_timeout: Duration,
    pub history_url: String,
    pub history_timeout: Duration,
    pub telegram: TelegramSettings,
}

fn timeout_secs(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<Duration, StrongscanError> {
    let secs = config.get_int(section, "timeout_secs", DEFAULT_TIMEOUT_SECS)?;
    if secs <= 0 {
        return Err(StrongscanError::ConfigInvalid {
            section: section.to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be at least 1".to_string(),
        });
    }
    Ok(Duration::from_secs(secs as u64))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn build_app_settings(
    config: &dyn ConfigPort,
    cli: &Cli,
) -> Result<AppSettings, StrongscanError> {
    let mut screen = build_screen_config(config)?;
    if let Some(dir) = &cli.workdir {
        screen.workdir = dir.clone();
    }

    let telegram = TelegramSettings {
        token: non_blank(cli.telegram_token.clone())
            .or_else(|| non_blank(config.get_string("telegram", "token"))),
        chat_id: non_blank(cli.telegram_chat_id.clone())
            .or_else(|| non_blank(config.get_string("telegram", "chat_id"))),
    };

    Ok(AppSettings {
        screen,
        snapshot_url: config
            .get_string("snapshot", "url")
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_URL.to_string()),
        snapshot_timeout: timeout_secs(config, "snapshot")?,
        history_url: config
            .get_string("history", "url")
            .unwrap_or_else(|| DEFAULT_CHART_URL.to_string()),
        history_timeout: timeout_secs(config, "history")?,
        telegram,
    })
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, StrongscanError> {
    match path {
        Some(p) => FileConfigAdapter::from_file(p).map_err(|e| StrongscanError::ConfigParse {
            file: p.display().to_string(),
            reason: e.to_string(),
        }),
        None => FileConfigAdapter::from_string("").map_err(|reason| {
            StrongscanError::ConfigParse {
                file: "<defaults>".to_string(),
                reason,
            }
        }),
    }
}

fn fail(err: StrongscanError) -> ExitCode {
    tracing::error!(error = %err, "strongscan failed");
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.log_json);

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let settings = match build_app_settings(&config, &cli) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let result = match &cli.command {
        Command::Run { no_pacing } => run_screen(&settings, *no_pacing),
        Command::Universe { input } => run_universe(&settings, input.as_deref()),
        Command::Evaluate { codes, no_pacing } => run_evaluate(&settings, codes, *no_pacing),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn make_pacer(settings: &AppSettings, no_pacing: bool) -> Box<dyn Pacer> {
    if no_pacing {
        Box::new(NoPacing)
    } else {
        Box::new(MinIntervalPacer::from_millis(settings.screen.pacing_ms))
    }
}

struct LivePorts {
    snapshot: TwseSnapshotAdapter,
    history: YahooHistoryAdapter,
    notifier: TelegramNotifier,
    artifacts: FileArtifactAdapter,
}

impl LivePorts {
    fn new(settings: &AppSettings, telegram: TelegramSettings) -> Result<Self, StrongscanError> {
        Ok(Self {
            snapshot: TwseSnapshotAdapter::new(&settings.snapshot_url, settings.snapshot_timeout)?,
            history: YahooHistoryAdapter::new(&settings.history_url, settings.history_timeout)?,
            notifier: TelegramNotifier::new(telegram)?,
            artifacts: FileArtifactAdapter::new(),
        })
    }

    fn ports(&self) -> ScreenPorts<'_> {
        ScreenPorts {
            snapshot: &self.snapshot,
            history: &self.history,
            notifier: &self.notifier,
            artifacts: &self.artifacts,
        }
    }
}

fn run_screen(settings: &AppSettings, no_pacing: bool) -> Result<(), StrongscanError> {
    if !settings.telegram.is_configured() {
        tracing::warn!("TELEGRAM_TOKEN or TELEGRAM_CHAT_ID missing; notifications disabled");
    }
    let live = LivePorts::new(settings, settings.telegram.clone())?;
    let screener = Screener::new(live.ports(), &settings.screen);
    let mut pacer = make_pacer(settings, no_pacing);

    let report = screener.run(pacer.as_mut())?;
    tracing::info!(
        universe = report.universe.count(),
        candidates = report.candidate_count(),
        charts_sent = report.charts_sent,
        "screen finished"
    );
    for outcome in report.candidates() {
        println!("{}\t{}", outcome.instrument.code, outcome.instrument.name);
    }
    Ok(())
}

fn read_snapshot_file(path: &Path) -> Result<Value, StrongscanError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        StrongscanError::fetch(&path.display().to_string(), format!("invalid JSON: {e}"))
    })
}

fn run_universe(settings: &AppSettings, input: Option<&Path>) -> Result<(), StrongscanError> {
    let payload = match input {
        Some(path) => read_snapshot_file(path)?,
        None => TwseSnapshotAdapter::new(&settings.snapshot_url, settings.snapshot_timeout)?
            .fetch_snapshot()?,
    };
    let build = UniverseBuilder::new(settings.screen.universe.clone()).build(&payload)?;
    tracing::info!(
        raw_rows = build.stats.raw_rows,
        excluded = build.stats.excluded,
        size = build.universe.count(),
        "universe built"
    );
    print!("{}", format_universe(&build.universe));
    Ok(())
}

/// Tab-separated listing: rank, code, name, lots, close.
pub fn format_universe(universe: &Universe) -> String {
    let mut out = String::from("rank\tcode\tname\tvolume_lots\tclose_price\n");
    for (i, inst) in universe.instruments.iter().enumerate() {
        let close = if inst.close_price.is_nan() {
            String::new()
        } else {
            inst.close_price.to_string()
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            i + 1,
            inst.code,
            inst.name,
            inst.volume_lots,
            close
        ));
    }
    out
}

fn run_evaluate(
    settings: &AppSettings,
    codes: &[String],
    no_pacing: bool,
) -> Result<(), StrongscanError> {
    // Ad-hoc evaluation never notifies.
    let live = LivePorts::new(settings, TelegramSettings::default())?;
    let screener = Screener::new(live.ports(), &settings.screen);
    let mut pacer = make_pacer(settings, no_pacing);

    let instruments: Vec<Instrument> = codes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| Instrument::new(c.to_string(), c.to_string(), 0.0, f64::NAN))
        .collect();
    for outcome in screener.evaluate_all(&instruments, pacer.as_mut(), false) {
        println!(
            "{}\t{}\t{}",
            outcome.instrument.code,
            if outcome.verdict.passed { "PASS" } else { "FAIL" },
            outcome.verdict.reason
        );
    }
    Ok(())
}
