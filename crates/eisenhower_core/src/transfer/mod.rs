//! Tabular export/import of the full task set.
//!
//! # Responsibility
//! - Serialize tasks to CSV or XLSX with one header row and one row per task.
//! - Parse CSV/XLSX rows back into validated `Task` records.
//!
//! # Invariants
//! - Column names and order are fixed by `COLUMNS`.
//! - Import never fails the batch because of one bad row; the row is
//!   skipped and reported in `ImportReport::skipped`.
//! - Unknown columns are ignored. A missing `title` column rejects every row.
//! - Logs carry row numbers and reason codes only, never cell contents.

mod csv_file;
mod row;
mod xlsx_file;

pub use row::RowError;

use crate::model::task::Task;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// Header row shared by CSV and XLSX files.
pub const COLUMNS: [&str; 11] = [
    "id",
    "title",
    "description",
    "importance",
    "urgency",
    "status",
    "due_date",
    "tags",
    "order_index",
    "created_at",
    "updated_at",
];

pub type TransferResult<T> = Result<T, TransferError>;

/// File-level export/import failures.
#[derive(Debug)]
pub enum TransferError {
    Io(std::io::Error),
    Csv(csv::Error),
    XlsxWrite(rust_xlsxwriter::XlsxError),
    XlsxRead(calamine::XlsxError),
    /// The workbook has no worksheet to read.
    EmptyWorkbook,
    /// File extension or format name is not `csv`/`xlsx`.
    UnsupportedFormat(String),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "csv error: {err}"),
            Self::XlsxWrite(err) => write!(f, "xlsx write error: {err}"),
            Self::XlsxRead(err) => write!(f, "xlsx read error: {err}"),
            Self::EmptyWorkbook => write!(f, "workbook contains no worksheet"),
            Self::UnsupportedFormat(value) => {
                write!(f, "unsupported file format `{value}`; expected csv|xlsx")
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::XlsxWrite(err) => Some(err),
            Self::XlsxRead(err) => Some(err),
            Self::EmptyWorkbook | Self::UnsupportedFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for TransferError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<rust_xlsxwriter::XlsxError> for TransferError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::XlsxWrite(value)
    }
}

impl From<calamine::XlsxError> for TransferError {
    fn from(value: calamine::XlsxError) -> Self {
        Self::XlsxRead(value)
    }
}

/// Supported tabular file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Infers the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(TransferError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One data row rejected during import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based row number in the file; the header is row 1.
    pub row: usize,
    pub reason: RowError,
}

/// Parsed rows plus the rows that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedRow>,
}

/// Writes all tasks to `path`, one row per task. Returns the row count.
pub fn export(tasks: &[Task], path: &Path, format: FileFormat) -> TransferResult<usize> {
    let result = match format {
        FileFormat::Csv => csv_file::write_tasks(tasks, path),
        FileFormat::Xlsx => xlsx_file::write_tasks(tasks, path),
    };
    match &result {
        Ok(rows) => info!(
            "event=export module=transfer status=ok format={} rows={rows}",
            format.as_str()
        ),
        Err(err) => warn!(
            "event=export module=transfer status=error format={} error={err}",
            format.as_str()
        ),
    }
    result
}

/// Parses tasks from `path`, inferring the format from its extension.
pub fn import(path: &Path) -> TransferResult<ImportReport> {
    let format = FileFormat::from_path(path).ok_or_else(|| {
        TransferError::UnsupportedFormat(
            path.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default()
                .to_string(),
        )
    })?;
    import_as(path, format)
}

/// Parses tasks from `path` using an explicit format.
pub fn import_as(path: &Path, format: FileFormat) -> TransferResult<ImportReport> {
    let rows = match format {
        FileFormat::Csv => csv_file::read_rows(path)?,
        FileFormat::Xlsx => xlsx_file::read_rows(path)?,
    };
    let report = row::parse_rows(rows);

    for skipped in &report.skipped {
        warn!(
            "event=import_row module=transfer status=skipped format={} row={} reason={}",
            format.as_str(),
            skipped.row,
            skipped.reason.code()
        );
    }
    info!(
        "event=import module=transfer status=ok format={} parsed={} skipped={}",
        format.as_str(),
        report.tasks.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Raw table content: header cells plus data rows with their row numbers.
#[derive(Debug, Default)]
pub(crate) struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug)]
pub(crate) struct RawRow {
    pub row: usize,
    pub cells: Result<Vec<String>, String>,
}
