//! Locating the market table inside a provider payload and mapping its
//! columns onto the four fields the universe needs.
//!
//! A payload is probed by an ordered list of [`TableShape`] matchers; the
//! first one that yields a well-formed `fields` + `data` pair wins.

use crate::domain::error::{SemanticField, UniverseError};
use serde_json::Value;

/// Rows plus declared field names, as delivered by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Build a table from a `fields` array and a `data` array. Declines
    /// (returns `None`) when either is not an array or any row length
    /// disagrees with the field count.
    pub fn from_values(fields: &Value, data: &Value) -> Option<Self> {
        let fields: Vec<String> = fields
            .as_array()?
            .iter()
            .map(|f| cell_text(f).unwrap_or_default().trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for row in data.as_array()? {
            let cells = row.as_array()?;
            if cells.len() != fields.len() {
                return None;
            }
            rows.push(cells.clone());
        }
        Some(Self { fields, rows })
    }
}

/// A structural probe over the snapshot payload.
pub trait TableShape {
    fn name(&self) -> &'static str;
    fn extract(&self, payload: &Value) -> Option<RawTable>;
}

/// `{"fields": [...], "data": [...]}` at the top level.
pub struct DirectShape;

/// `{"<any key>": {"fields": [...], "data": [...]}, ...}`, one level deep.
pub struct NestedShape;

const FIELDS_KEY: &str = "fields";
const DATA_KEY: &str = "data";

fn table_in(object: &Value) -> Option<RawTable> {
    let map = object.as_object()?;
    let fields = map.get(FIELDS_KEY)?;
    let data = map.get(DATA_KEY)?;
    RawTable::from_values(fields, data)
}

impl TableShape for DirectShape {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn extract(&self, payload: &Value) -> Option<RawTable> {
        table_in(payload)
    }
}

impl TableShape for NestedShape {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn extract(&self, payload: &Value) -> Option<RawTable> {
        payload.as_object()?.values().find_map(table_in)
    }
}

/// The shapes the snapshot provider is known to emit, in probe order.
pub fn default_shapes() -> Vec<Box<dyn TableShape>> {
    vec![Box::new(DirectShape), Box::new(NestedShape)]
}

pub fn locate_table(
    payload: &Value,
    shapes: &[Box<dyn TableShape>],
) -> Result<RawTable, UniverseError> {
    for shape in shapes {
        if let Some(table) = shape.extract(payload) {
            tracing::debug!(
                shape = shape.name(),
                fields = table.fields.len(),
                rows = table.rows.len(),
                "located snapshot table"
            );
            return Ok(table);
        }
    }
    Err(UniverseError::SchemaNotFound)
}

/// Provider field labels, matched as substrings of the declared field names.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLabels {
    pub code: String,
    pub name: String,
    pub volume: String,
    pub close: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            code: "證券代號".to_string(),
            name: "證券名稱".to_string(),
            volume: "成交股數".to_string(),
            close: "收盤價".to_string(),
        }
    }
}

impl ColumnLabels {
    fn label(&self, field: SemanticField) -> &str {
        match field {
            SemanticField::Code => &self.code,
            SemanticField::Name => &self.name,
            SemanticField::Volume => &self.volume,
            SemanticField::Close => &self.close,
        }
    }
}

/// Column indices for the four resolved fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub code: usize,
    pub name: usize,
    pub volume: usize,
    pub close: usize,
}

/// Resolve each semantic field to the first declared field whose name
/// contains its label. When several fields contain the same label the
/// earliest wins, not the last; the exchange's own labels each match a
/// single column, so live snapshots never hit the tie.
pub fn resolve_columns(fields: &[String], labels: &ColumnLabels) -> Result<ColumnMap, UniverseError> {
    let find = |field: SemanticField| {
        let label = labels.label(field);
        fields.iter().position(|f| f.contains(label))
    };

    let found: Vec<(SemanticField, Option<usize>)> = SemanticField::ALL
        .iter()
        .map(|&f| (f, find(f)))
        .collect();

    match (found[0].1, found[1].1, found[2].1, found[3].1) {
        (Some(code), Some(name), Some(volume), Some(close)) => Ok(ColumnMap {
            code,
            name,
            volume,
            close,
        }),
        _ => Err(UniverseError::MissingColumns {
            resolved: found
                .into_iter()
                .filter_map(|(f, idx)| idx.map(|_| f))
                .collect(),
        }),
    }
}

/// Text of a cell; `None` for null.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
