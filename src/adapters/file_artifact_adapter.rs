//! Filesystem artifact sink: CSV tables and SVG charts.

use crate::adapters::chart_svg::render_chart;
use crate::domain::code_data::CodeData;
use crate::domain::error::StrongscanError;
use crate::ports::artifact_port::{ArtifactPort, Table};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Spreadsheet tools need the byte-order mark to read CJK names as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Default, Clone, Copy)]
pub struct FileArtifactAdapter;

impl FileArtifactAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn artifact_err(path: &Path, e: impl std::fmt::Display) -> StrongscanError {
    StrongscanError::Artifact {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn ensure_parent(path: &Path) -> Result<(), StrongscanError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| artifact_err(dir, e))
        }
        _ => Ok(()),
    }
}

impl ArtifactPort for FileArtifactAdapter {
    fn write_table(&self, table: &Table, path: &Path) -> Result<(), StrongscanError> {
        ensure_parent(path)?;
        let mut file = File::create(path).map_err(|e| artifact_err(path, e))?;
        file.write_all(UTF8_BOM).map_err(|e| artifact_err(path, e))?;

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(&table.headers)
            .map_err(|e| artifact_err(path, e))?;
        for row in &table.rows {
            writer.write_record(row).map_err(|e| artifact_err(path, e))?;
        }
        writer.flush().map_err(|e| artifact_err(path, e))?;
        tracing::debug!(path = %path.display(), rows = table.len(), "table written");
        Ok(())
    }

    fn write_image(&self, data: &CodeData, path: &Path) -> Result<(), StrongscanError> {
        ensure_parent(path)?;
        let svg = render_chart(data).map_err(|e| artifact_err(path, e))?;
        fs::write(path, svg).map_err(|e| artifact_err(path, e))?;
        tracing::debug!(path = %path.display(), code = %data.code, "chart written");
        Ok(())
    }
}
