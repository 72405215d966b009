//! CSV reader/writer over the shared column contract.

use super::row::task_to_record;
use super::{RawRow, RawTable, TransferResult, COLUMNS};
use crate::model::task::Task;
use std::path::Path;

pub(crate) fn write_tasks(tasks: &[Task], path: &Path) -> TransferResult<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMNS)?;
    for task in tasks {
        writer.write_record(task_to_record(task))?;
    }
    writer.flush()?;
    Ok(tasks.len())
}

/// Reads the header and every data row. Rows that cannot be decoded are
/// kept as errors so the caller can report them.
pub(crate) fn read_rows(path: &Path) -> TransferResult<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let header = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let rows = reader
        .records()
        .enumerate()
        .map(|(offset, record)| RawRow {
            row: offset + 2,
            cells: record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|err| err.to_string()),
        })
        .collect();

    Ok(RawTable { header, rows })
}
