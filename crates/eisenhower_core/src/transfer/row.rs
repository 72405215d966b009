//! Mapping between `Task` records and table rows.

use super::{ImportReport, RawTable, SkippedRow};
use crate::model::task::{
    normalize_tags, now_millis, parse_due_date, Cell, Level, Task, TaskStatus,
    TaskValidationError, DUE_DATE_FORMAT,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Why one imported row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// A required column is absent from the header.
    MissingColumn(&'static str),
    /// A field failed validation against the task model.
    Invalid(TaskValidationError),
    /// `order_index` is not a non-negative integer.
    InvalidOrderIndex(String),
    /// The row could not be decoded at all.
    Unreadable(String),
}

impl RowError {
    /// Stable reason code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingColumn(_) => "missing_column",
            Self::Invalid(TaskValidationError::EmptyTitle) => "empty_title",
            Self::Invalid(TaskValidationError::InvalidLevel(_)) => "invalid_level",
            Self::Invalid(TaskValidationError::InvalidStatus(_)) => "invalid_status",
            Self::Invalid(TaskValidationError::InvalidDueDate(_)) => "invalid_due_date",
            Self::Invalid(_) => "invalid_field",
            Self::InvalidOrderIndex(_) => "invalid_order_index",
            Self::Unreadable(_) => "unreadable_row",
        }
    }
}

impl Display for RowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(column) => write!(f, "missing required column `{column}`"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::InvalidOrderIndex(value) => write!(f, "invalid order_index `{value}`"),
            Self::Unreadable(message) => write!(f, "unreadable row: {message}"),
        }
    }
}

impl From<TaskValidationError> for RowError {
    fn from(value: TaskValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Renders one task in `COLUMNS` order.
pub(crate) fn task_to_record(task: &Task) -> Vec<String> {
    vec![
        task.id.to_string(),
        task.title.clone(),
        task.description.clone().unwrap_or_default(),
        task.importance.as_str().to_string(),
        task.urgency.as_str().to_string(),
        task.status.as_str().to_string(),
        task.due_date
            .map(|date| date.format(DUE_DATE_FORMAT).to_string())
            .unwrap_or_default(),
        serde_json::to_string(&task.tags).unwrap_or_else(|_| "[]".to_string()),
        task.order_index.to_string(),
        format_timestamp(task.created_at),
        task.updated_at.map(format_timestamp).unwrap_or_default(),
    ]
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts raw table rows into tasks, collecting per-row failures.
pub(crate) fn parse_rows(table: RawTable) -> ImportReport {
    let header = Header::new(&table.header);
    let mut report = ImportReport::default();

    for raw in table.rows {
        let parsed = raw
            .cells
            .map_err(RowError::Unreadable)
            .and_then(|cells| header.parse(&cells));
        match parsed {
            Ok(task) => report.tasks.push(task),
            Err(reason) => report.skipped.push(SkippedRow {
                row: raw.row,
                reason,
            }),
        }
    }
    report
}

/// Column name to index lookup. Names are matched trimmed and lowercase.
struct Header {
    index: HashMap<String, usize>,
}

impl Header {
    fn new(names: &[String]) -> Self {
        let mut index = HashMap::new();
        for (position, name) in names.iter().enumerate() {
            let key = name.trim_start_matches('\u{feff}').trim().to_ascii_lowercase();
            index.entry(key).or_insert(position);
        }
        Self { index }
    }

    /// Returns the trimmed, non-empty value of a column.
    fn field<'a>(&self, cells: &'a [String], column: &str) -> Option<&'a str> {
        self.index
            .get(column)
            .and_then(|position| cells.get(*position))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn parse(&self, cells: &[String]) -> Result<Task, RowError> {
        if !self.index.contains_key("title") {
            return Err(RowError::MissingColumn("title"));
        }
        let title = self
            .field(cells, "title")
            .ok_or(TaskValidationError::EmptyTitle)?;

        let importance = self
            .field(cells, "importance")
            .map(str::parse::<Level>)
            .transpose()?
            .unwrap_or_default();
        let urgency = self
            .field(cells, "urgency")
            .map(str::parse::<Level>)
            .transpose()?
            .unwrap_or_default();
        let status = self
            .field(cells, "status")
            .map(str::parse::<TaskStatus>)
            .transpose()?
            .unwrap_or_default();
        let due_date = self
            .field(cells, "due_date")
            .map(parse_due_date)
            .transpose()?;
        let tags = match self.field(cells, "tags") {
            Some(value) => normalize_tags(split_tags(value))?,
            None => Default::default(),
        };
        let order_index = self
            .field(cells, "order_index")
            .map(parse_order_index)
            .transpose()?
            .unwrap_or(0);

        let id = self
            .field(cells, "id")
            .and_then(|value| Uuid::parse_str(value).ok())
            .filter(|id| !id.is_nil())
            .unwrap_or_else(Uuid::new_v4);

        let mut task = Task::with_id(id, title, Cell::new(importance, urgency));
        task.description = self.field(cells, "description").map(str::to_string);
        task.status = status;
        task.due_date = due_date;
        task.tags = tags;
        task.order_index = order_index;
        task.created_at = self
            .field(cells, "created_at")
            .and_then(parse_timestamp)
            .unwrap_or_else(now_millis);
        task.updated_at = self.field(cells, "updated_at").and_then(parse_timestamp);
        task.validate()?;
        Ok(task)
    }
}

/// Accepts a JSON array of strings; anything else is split on commas.
fn split_tags(value: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(value) {
        Ok(tags) => tags,
        Err(_) => value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Integer text, or a whole float as spreadsheets store numbers.
fn parse_order_index(value: &str) -> Result<i64, RowError> {
    let parsed = value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|number| number.fract() == 0.0 && *number >= 0.0 && *number <= i64::MAX as f64)
            .map(|number| number as i64)
    });
    match parsed {
        Some(index) if index >= 0 => Ok(index),
        _ => Err(RowError::InvalidOrderIndex(value.to_string())),
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::RawRow;

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            header: header.iter().map(|name| name.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(offset, cells)| RawRow {
                    row: offset + 2,
                    cells: Ok(cells.iter().map(|cell| cell.to_string()).collect()),
                })
                .collect(),
        }
    }

    #[test]
    fn defaults_apply_to_missing_optional_columns() {
        let report = parse_rows(table(&["Title", "extra"], &[&["buy milk", "ignored"]]));
        assert!(report.skipped.is_empty());
        let task = &report.tasks[0];
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.cell(), Cell::default());
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.tags.is_empty());
    }

    #[test]
    fn missing_title_column_rejects_every_row() {
        let report = parse_rows(table(&["importance"], &[&["high"], &["low"]]));
        assert!(report.tasks.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].reason, RowError::MissingColumn("title"));
        assert_eq!(report.skipped[1].row, 3);
    }

    #[test]
    fn invalid_enums_are_reported_per_row() {
        let report = parse_rows(table(
            &["title", "importance", "urgency", "status"],
            &[
                &["ok", "high", "low", "in-progress"],
                &["bad level", "urgent", "low", "todo"],
                &["bad status", "low", "low", "done"],
            ],
        ));
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].status, TaskStatus::InProgress);
        let codes: Vec<_> = report.skipped.iter().map(|s| s.reason.code()).collect();
        assert_eq!(codes, ["invalid_level", "invalid_status"]);
    }

    #[test]
    fn tags_fall_back_to_comma_split() {
        let report = parse_rows(table(
            &["title", "tags"],
            &[&["a", r#"["home","work"]"#], &["b", "home, errands"]],
        ));
        let tags: Vec<Vec<_>> = report
            .tasks
            .iter()
            .map(|task| task.tags.iter().cloned().collect())
            .collect();
        assert_eq!(tags[0], ["home", "work"]);
        assert_eq!(tags[1], ["errands", "home"]);
    }

    #[test]
    fn invalid_id_gets_fresh_identity() {
        let report = parse_rows(table(&["id", "title"], &[&["not-a-uuid", "x"]]));
        assert!(!report.tasks[0].id.is_nil());
    }

    #[test]
    fn order_index_accepts_whole_floats_only() {
        assert_eq!(parse_order_index("3").unwrap(), 3);
        assert_eq!(parse_order_index("2.0").unwrap(), 2);
        assert!(parse_order_index("1.5").is_err());
        assert!(parse_order_index("-1").is_err());
    }

    #[test]
    fn naive_iso_timestamps_parse_as_utc() {
        let parsed = parse_timestamp("2024-05-01T08:30:00.250000").unwrap();
        assert_eq!(format_timestamp(parsed), "2024-05-01T08:30:00.250Z");
    }

    #[test]
    fn unreadable_rows_are_skipped() {
        let mut raw = table(&["title"], &[&["fine"]]);
        raw.rows.push(RawRow {
            row: 3,
            cells: Err("invalid utf-8".to_string()),
        });
        let report = parse_rows(raw);
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.skipped[0].reason.code(), "unreadable_row");
    }
}
