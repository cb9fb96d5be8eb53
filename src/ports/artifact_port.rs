//! On-disk artifact port (tables and charts).

use crate::domain::code_data::CodeData;
use crate::domain::error::StrongscanError;
use std::path::Path;

/// A header row plus string cells, ready for a tabular writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub trait ArtifactPort {
    fn write_table(&self, table: &Table, path: &Path) -> Result<(), StrongscanError>;
    fn write_image(&self, data: &CodeData, path: &Path) -> Result<(), StrongscanError>;
}
