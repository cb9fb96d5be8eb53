//! End-to-end screen runs against in-memory ports.

mod common;

use common::*;
use proptest::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use strongscan::domain::pacing::MinIntervalPacer;
use strongscan::domain::error::StrongscanError;
use strongscan::domain::exclusion::ExclusionPolicy;
use strongscan::domain::screen::{ScreenConfig, ScreenPorts, ScreenReport, Screener};
use strongscan::domain::strength::SkipReason;
use strongscan::domain::universe::{UniverseConfig, build_universe};

const NO_CANDIDATES: &str = "No stocks met the strength criteria today.";

fn config() -> ScreenConfig {
    ScreenConfig {
        workdir: PathBuf::from("out"),
        pacing_ms: 0,
        ..ScreenConfig::default()
    }
}

struct Harness {
    snapshot: MockSnapshotPort,
    history: MockHistoryPort,
    notifier: RecordingNotifier,
    artifacts: RecordingArtifacts,
    config: ScreenConfig,
}

impl Harness {
    fn new(snapshot: MockSnapshotPort, history: MockHistoryPort) -> Self {
        Self {
            snapshot,
            history,
            notifier: RecordingNotifier::default(),
            artifacts: RecordingArtifacts::default(),
            config: config(),
        }
    }

    fn run(&self) -> (Result<ScreenReport, StrongscanError>, usize) {
        let screener = Screener::new(
            ScreenPorts {
                snapshot: &self.snapshot,
                history: &self.history,
                notifier: &self.notifier,
                artifacts: &self.artifacts,
            },
            &self.config,
        );
        let mut pacer = CountingPacer::default();
        let result = screener.run(&mut pacer);
        (result, pacer.count.get())
    }
}

fn three_stock_snapshot() -> MockSnapshotPort {
    MockSnapshotPort::Payload(snapshot(&[
        ("2330", "台積電", "30,000", "593.00"),
        ("2317", "鴻海", "50,000", "105.50"),
        ("2303", "聯電", "40,000", "--"),
    ]))
}

mod fatal_paths {
    use super::*;

    #[test]
    fn snapshot_fetch_failure_aborts_with_one_failure_message() {
        let h = Harness::new(
            MockSnapshotPort::Failing("connection reset".into()),
            MockHistoryPort::new(),
        );
        let (result, paced) = h.run();

        assert!(matches!(result, Err(StrongscanError::Fetch { .. })));
        let texts = h.notifier.texts();
        let failures: Vec<&String> = texts.iter().filter(|t| t.contains("failed")).collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("connection reset"));
        assert!(h.artifacts.table_paths().is_empty());
        assert!(h.history.calls().is_empty());
        assert_eq!(paced, 0);
    }

    #[test]
    fn unrecognised_payload_is_schema_error() {
        let h = Harness::new(
            MockSnapshotPort::Payload(serde_json::json!({"stat": "很抱歉，沒有符合條件的資料!"})),
            MockHistoryPort::new(),
        );
        let (result, _) = h.run();

        assert!(matches!(result, Err(StrongscanError::Schema(_))));
        assert!(h.notifier.texts().last().unwrap().contains("parse failed"));
        assert!(h.artifacts.table_paths().is_empty());
        assert!(h.history.calls().is_empty());
    }

    #[test]
    fn missing_column_is_schema_error_naming_found_columns() {
        let payload = serde_json::json!({
            "fields": ["證券代號", "證券名稱", "成交筆數"],
            "data": [["2330", "台積電", "100"]]
        });
        let h = Harness::new(MockSnapshotPort::Payload(payload), MockHistoryPort::new());
        let (result, _) = h.run();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("code, name"));
    }
}

mod outcomes {
    use super::*;

    #[test]
    fn empty_universe_sends_no_candidates_message() {
        let h = Harness::new(
            MockSnapshotPort::Payload(snapshot(&[("00878", "國泰永續高股息ETF", "9,000,000", "22.1")])),
            MockHistoryPort::new(),
        );
        let (result, paced) = h.run();

        let report = result.unwrap();
        assert_eq!(report.universe.count(), 0);
        assert_eq!(paced, 0);
        assert_eq!(h.notifier.texts().last().unwrap(), NO_CANDIDATES);
        assert!(h.notifier.photos().is_empty());
    }

    #[test]
    fn no_passes_sends_explicit_message_and_skips_candidate_csv() {
        let history = MockHistoryPort::new()
            .with_series("2330.TW", flat_series("2330.TW"))
            .with_series("2317.TW", flat_series("2317.TW"))
            .with_series("2303.TW", flat_series("2303.TW"));
        let h = Harness::new(three_stock_snapshot(), history);
        let (result, _) = h.run();

        let report = result.unwrap();
        assert_eq!(report.candidate_count(), 0);
        assert_eq!(h.notifier.texts().last().unwrap(), NO_CANDIDATES);
        assert!(h.artifacts.table("top_volume_stocks.csv").is_some());
        assert!(h.artifacts.table("strong_stocks.csv").is_none());
        assert_eq!(h.artifacts.image_count(), 0);
    }

    #[test]
    fn universe_csv_is_ranked_and_blanks_unknown_price() {
        let h = Harness::new(three_stock_snapshot(), MockHistoryPort::new());
        h.run().0.unwrap();

        let table = h.artifacts.table("top_volume_stocks.csv").unwrap();
        let codes: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(codes, vec!["2317", "2303", "2330"]);
        assert_eq!(table.rows[1][3], "");
        assert_eq!(table.rows[0][4], "50");
    }

    #[test]
    fn candidates_listed_and_charts_capped_at_five() {
        let rows: Vec<(String, String)> = (0..7)
            .map(|i| (format!("{}", 1101 + i), format!("股票{i}")))
            .collect();
        let volumes: Vec<String> = (0..7).map(|i| format!("{}", 100_000 - i * 1000)).collect();
        let snapshot_rows: Vec<(&str, &str, &str, &str)> = rows
            .iter()
            .zip(&volumes)
            .map(|((c, n), v)| (c.as_str(), n.as_str(), v.as_str(), "10.0"))
            .collect();
        let mut history = MockHistoryPort::new();
        for (code, _) in &rows {
            let symbol = format!("{code}.TW");
            history = history.with_series(&symbol, passing_series(&symbol));
        }
        let h = Harness::new(MockSnapshotPort::Payload(snapshot(&snapshot_rows)), history);
        let (result, _) = h.run();

        let report = result.unwrap();
        assert_eq!(report.candidate_count(), 7);
        assert_eq!(report.charts_sent, 5);
        assert_eq!(h.notifier.photos().len(), 5);
        assert_eq!(h.artifacts.image_count(), 7);

        let message = h
            .notifier
            .texts()
            .into_iter()
            .find(|t| t.contains("1101 股票0"))
            .unwrap();
        assert_eq!(message.lines().count(), 8);

        let csv = h.artifacts.table("strong_stocks.csv").unwrap();
        assert_eq!(csv.headers, vec!["symbol", "name", "reason"]);
        assert_eq!(csv.len(), 7);
        assert!(csv.rows[0][2].contains("\"pct\":4.0"));
    }

    #[test]
    fn history_error_does_not_affect_next_symbol() {
        let history = MockHistoryPort::new()
            .with_series("2317.TW", passing_series("2317.TW"))
            .with_error("2303.TW", "429 Too Many Requests")
            .with_series("2330.TW", passing_series("2330.TW"));
        let h = Harness::new(three_stock_snapshot(), history);
        let (result, _) = h.run();

        let report = result.unwrap();
        let reasons: Vec<String> = report
            .outcomes
            .iter()
            .map(|o| o.verdict.reason.to_string())
            .collect();
        assert!(reasons[1].starts_with("error:"));
        assert!(reasons[1].contains("429"));
        assert!(report.outcomes[0].verdict.passed);
        assert!(report.outcomes[2].verdict.passed);
        assert_eq!(report.candidate_count(), 2);
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let h = Harness::new(three_stock_snapshot(), MockHistoryPort::new());
        let report = h.run().0.unwrap();
        for outcome in &report.outcomes {
            assert_eq!(outcome.verdict.skip_reason(), Some(&SkipReason::NoData));
        }
    }

    #[test]
    fn short_history_is_skipped() {
        let short = make_series("2317.TW", &[100.0; 9], &[100.0; 9]);
        let history = MockHistoryPort::new().with_series("2317.TW", short);
        let h = Harness::new(three_stock_snapshot(), history);
        let report = h.run().0.unwrap();
        assert_eq!(
            report.outcomes[0].verdict.skip_reason(),
            Some(&SkipReason::ShortHistory)
        );
    }

    #[test]
    fn fetches_in_universe_order_with_one_pace_each() {
        let h = Harness::new(three_stock_snapshot(), MockHistoryPort::new());
        let (result, paced) = h.run();
        result.unwrap();
        assert_eq!(h.history.calls(), vec!["2317.TW", "2303.TW", "2330.TW"]);
        assert_eq!(paced, 3);
    }

    #[test]
    fn slow_fetches_still_get_full_pause_after_each() {
        let history = SlowHistoryPort::new(Duration::from_millis(80));
        let snapshot = three_stock_snapshot();
        let notifier = RecordingNotifier::default();
        let artifacts = RecordingArtifacts::default();
        let config = config();
        let screener = Screener::new(
            ScreenPorts {
                snapshot: &snapshot,
                history: &history,
                notifier: &notifier,
                artifacts: &artifacts,
            },
            &config,
        );
        let mut pacer = MinIntervalPacer::from_millis(50);
        screener.run(&mut pacer).unwrap();

        let gaps = history.gaps();
        assert_eq!(gaps.len(), 2);
        for gap in gaps {
            assert!(gap >= Duration::from_millis(45), "gap was {gap:?}");
        }
    }

    #[test]
    fn side_effect_failures_do_not_abort() {
        let history = MockHistoryPort::new().with_series("2317.TW", passing_series("2317.TW"));
        let mut h = Harness::new(three_stock_snapshot(), history);
        h.notifier = RecordingNotifier::failing();
        h.artifacts = RecordingArtifacts::failing();
        let (result, _) = h.run();

        let report = result.unwrap();
        assert_eq!(report.candidate_count(), 1);
        assert_eq!(report.charts_sent, 0);
        assert!(report.outcomes[0].chart.is_none());
    }

    #[test]
    fn top_n_truncates_before_evaluation() {
        let mut h = Harness::new(three_stock_snapshot(), MockHistoryPort::new());
        h.config.universe.top_n = 2;
        let (result, paced) = h.run();
        assert_eq!(result.unwrap().universe.codes(), vec!["2317", "2303"]);
        assert_eq!(paced, 2);
    }
}

fn arb_row() -> impl Strategy<Value = (String, String, u64)> {
    (
        "[0-9]{4}",
        prop_oneof![
            Just("台積電".to_string()),
            Just("元大台灣50".to_string()),
            Just("國泰金".to_string()),
            Just("鴻海".to_string()),
            Just("聯發科".to_string()),
            Just("中華電".to_string()),
        ],
        0u64..10_000_000,
    )
}

proptest! {
    #[test]
    fn universe_is_sorted_bounded_and_filtered(
        rows in prop::collection::vec(arb_row(), 0..60),
        top_n in 1usize..40,
    ) {
        let formatted: Vec<(String, String, String)> = rows
            .iter()
            .map(|(c, n, v)| (c.clone(), n.clone(), v.to_string()))
            .collect();
        let refs: Vec<(&str, &str, &str, &str)> = formatted
            .iter()
            .map(|(c, n, v)| (c.as_str(), n.as_str(), v.as_str(), "1.0"))
            .collect();
        let config = UniverseConfig { top_n, ..UniverseConfig::default() };
        let universe = build_universe(&snapshot(&refs), &config).unwrap();

        let policy = ExclusionPolicy::default();
        let eligible = rows.iter().filter(|(_, n, _)| !policy.excludes(n)).count();
        prop_assert_eq!(universe.count(), eligible.min(top_n));
        for w in universe.instruments.windows(2) {
            prop_assert!(w[0].volume_shares >= w[1].volume_shares);
        }
        for inst in &universe.instruments {
            prop_assert!(!policy.excludes(&inst.name));
            prop_assert!(!inst.code.is_empty());
            prop_assert!(inst.volume_lots >= 0.0);
        }
    }
}
