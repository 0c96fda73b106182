//! Input and output datasets.
//!
//! Inputs are a spreadsheet (first sheet, header row) or a JSON array of
//! objects. Outputs are written once per run as xlsx or JSON.

mod json;
mod xlsx;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::{InputRecord, OutputRecord};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Failed to write spreadsheet: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid JSON dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("{0} has no sheet with a header row")]
    EmptyWorkbook(PathBuf),

    #[error("Unsupported dataset format: {0} (expected .xlsx or .json)")]
    UnsupportedFormat(PathBuf),
}

/// On-disk representation, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Xlsx,
    Json,
}

impl DatasetFormat {
    /// Format for reading. Any spreadsheet calamine understands is accepted.
    pub fn for_input(path: &Path) -> Result<Self, DatasetError> {
        match extension(path).as_deref() {
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Self::Xlsx),
            Some("json") => Ok(Self::Json),
            _ => Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Format for writing.
    pub fn for_output(path: &Path) -> Result<Self, DatasetError> {
        match extension(path).as_deref() {
            Some("xlsx") => Ok(Self::Xlsx),
            Some("json") => Ok(Self::Json),
            _ => Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Which input columns hold the site name and its location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Columns {
    pub name: String,
    pub location: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: "POI_NM".to_string(),
            location: "SIGNGU_NM".to_string(),
        }
    }
}

/// Load every record from `path`, in file order.
pub fn load_records(path: &Path, columns: &Columns) -> Result<Vec<InputRecord>, DatasetError> {
    let records = match DatasetFormat::for_input(path)? {
        DatasetFormat::Xlsx => xlsx::read(path, columns)?,
        DatasetFormat::Json => json::read(path, columns)?,
    };
    info!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Write all records to `path`, replacing any existing file.
pub fn save_records(path: &Path, records: &[OutputRecord]) -> Result<(), DatasetError> {
    match DatasetFormat::for_output(path)? {
        DatasetFormat::Xlsx => xlsx::write(path, records),
        DatasetFormat::Json => json::write(path, records),
    }
}

/// Where a run's results go. Flushed once per run.
pub trait RecordSink: Send {
    fn flush(&mut self, records: &[OutputRecord]) -> Result<(), DatasetError>;

    /// Human-readable destination for logs.
    fn destination(&self) -> String;
}

/// Sink writing to a file whose format follows its extension.
#[derive(Debug, Clone)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    /// Validate the extension up front so a bad path fails before the run.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let path = path.into();
        DatasetFormat::for_output(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for OutputFile {
    fn flush(&mut self, records: &[OutputRecord]) -> Result<(), DatasetError> {
        save_records(&self.path, records)
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Locate `column` in a header row.
pub(crate) fn column_index(
    header: &[String],
    column: &str,
    path: &Path,
) -> Result<usize, DatasetError> {
    header
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| DatasetError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            DatasetFormat::for_input(Path::new("sites.XLSX")).unwrap(),
            DatasetFormat::Xlsx
        );
        assert_eq!(
            DatasetFormat::for_input(Path::new("sites.json")).unwrap(),
            DatasetFormat::Json
        );
        assert!(DatasetFormat::for_output(Path::new("out.ods")).is_err());
        assert!(matches!(
            DatasetFormat::for_input(Path::new("sites.csv")),
            Err(DatasetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn output_file_rejects_unknown_extension_early() {
        assert!(OutputFile::new("results.txt").is_err());
        let sink = OutputFile::new("results.json").unwrap();
        assert_eq!(sink.destination(), "results.json");
    }

    #[test]
    fn missing_column_names_the_column() {
        let header = vec!["POI_NM".to_string()];
        let err = column_index(&header, "SIGNGU_NM", Path::new("in.xlsx")).unwrap_err();
        assert_eq!(err.to_string(), "Column 'SIGNGU_NM' not found in in.xlsx");
    }
}
