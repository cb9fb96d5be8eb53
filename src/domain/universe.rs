//! Universe builder.
//!
//! Turns the exchange-wide daily snapshot into a volume-ranked list of
//! common-equity instruments, capped at `top_n`.

use crate::domain::error::UniverseError;
use crate::domain::exclusion::ExclusionPolicy;
use crate::domain::instrument::{CellParser, Instrument, clean_name};
use crate::domain::market_table::{
    ColumnLabels, ColumnMap, RawTable, TableShape, cell_text, default_shapes, locate_table,
    resolve_columns,
};
use serde_json::Value;

pub const DEFAULT_TOP_N: usize = 300;

#[derive(Debug, Clone)]
pub struct UniverseConfig {
    pub top_n: usize,
    pub labels: ColumnLabels,
    pub parser: CellParser,
    pub exclusion: ExclusionPolicy,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            labels: ColumnLabels::default(),
            parser: CellParser::default(),
            exclusion: ExclusionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    pub instruments: Vec<Instrument>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.code.as_str()).collect()
    }
}

/// Counts of what happened to the raw rows, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniverseStats {
    pub raw_rows: usize,
    pub missing_identity: usize,
    pub excluded: usize,
    pub truncated: usize,
}

#[derive(Debug)]
pub struct UniverseBuild {
    pub universe: Universe,
    pub stats: UniverseStats,
}

pub struct UniverseBuilder {
    config: UniverseConfig,
    shapes: Vec<Box<dyn TableShape>>,
}

impl UniverseBuilder {
    pub fn new(config: UniverseConfig) -> Self {
        Self {
            config,
            shapes: default_shapes(),
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<Box<dyn TableShape>>) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn build(&self, payload: &Value) -> Result<UniverseBuild, UniverseError> {
        let table = locate_table(payload, &self.shapes)?;
        let columns = resolve_columns(&table.fields, &self.config.labels)?;
        Ok(self.build_from_table(&table, columns))
    }

    fn build_from_table(&self, table: &RawTable, columns: ColumnMap) -> UniverseBuild {
        let mut stats = UniverseStats {
            raw_rows: table.rows.len(),
            ..UniverseStats::default()
        };

        let mut instruments = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let Some(instrument) = self.normalize_row(row, columns) else {
                stats.missing_identity += 1;
                continue;
            };
            if let Some(rule) = self.config.exclusion.matching_rule(&instrument.name) {
                tracing::trace!(
                    code = %instrument.code,
                    name = %instrument.name,
                    keyword = %rule.keyword,
                    "excluded"
                );
                stats.excluded += 1;
                continue;
            }
            instruments.push(instrument);
        }

        // `sort_by` is stable, so equal volumes keep table order.
        instruments.sort_by(|a, b| b.volume_shares.total_cmp(&a.volume_shares));
        stats.truncated = instruments.len().saturating_sub(self.config.top_n);
        instruments.truncate(self.config.top_n);

        UniverseBuild {
            universe: Universe { instruments },
            stats,
        }
    }

    fn normalize_row(&self, row: &[Value], columns: ColumnMap) -> Option<Instrument> {
        let code = cell_text(&row[columns.code])?.trim().to_string();
        let name = clean_name(&cell_text(&row[columns.name])?);
        if code.is_empty() || name.is_empty() {
            return None;
        }
        let parser = &self.config.parser;
        let volume = cell_text(&row[columns.volume])
            .map(|s| parser.parse_volume(&s))
            .unwrap_or(0.0);
        let close = cell_text(&row[columns.close])
            .map(|s| parser.parse_price(&s))
            .unwrap_or(f64::NAN);
        Some(Instrument::new(code, name, volume, close))
    }
}

/// Build a universe with the given configuration and the default shapes.
pub fn build_universe(payload: &Value, config: &UniverseConfig) -> Result<Universe, UniverseError> {
    UniverseBuilder::new(config.clone())
        .build(payload)
        .map(|b| b.universe)
}
