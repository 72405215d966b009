//! XLSX workbook writer and reader: one `Tasks` sheet, same columns as CSV.

use super::row::task_to_record;
use super::{RawRow, RawTable, TransferError, TransferResult, COLUMNS};
use crate::model::task::Task;
use calamine::{open_workbook, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

const SHEET_NAME: &str = "Tasks";
const ORDER_INDEX_COLUMN: usize = 8;

pub(crate) fn write_tasks(tasks: &[Task], path: &Path) -> TransferResult<usize> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (column, name) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, column as u16, *name, &header_format)?;
    }

    for (offset, task) in tasks.iter().enumerate() {
        let row = offset as u32 + 1;
        for (column, value) in task_to_record(task).iter().enumerate() {
            if column == ORDER_INDEX_COLUMN {
                worksheet.write_number(row, column as u16, task.order_index as f64)?;
            } else {
                worksheet.write_string(row, column as u16, value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(tasks.len())
}

/// Reads the first worksheet. The first row is the header.
pub(crate) fn read_rows(path: &Path) -> TransferResult<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TransferError::EmptyWorkbook)??;
    let first_row = range.start().map_or(0, |(row, _)| row as usize);

    let mut rows = range
        .rows()
        .map(|cells| cells.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());

    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };

    let rows = rows
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|cell| !cell.trim().is_empty()))
        .map(|(offset, cells)| RawRow {
            row: first_row + offset + 2,
            cells: Ok(cells),
        })
        .collect();

    Ok(RawTable { header, rows })
}
