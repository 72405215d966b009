//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert-or-update, delete and listing APIs over the `tasks` table.
//! - Keep SQL details and matrix ordering inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listings are deterministic: grid cell order, then `order_index ASC, id ASC`.
//! - Multi-row writes run in one `BEGIN IMMEDIATE` transaction.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::{
    Cell, Level, Task, TaskId, TaskStatus, TaskValidationError, DUE_DATE_FORMAT,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    importance,
    urgency,
    status,
    due_date,
    tags,
    order_index,
    created_at,
    updated_at
FROM tasks";

const GRID_ORDER_SQL: &str = "ORDER BY
    CASE importance WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END ASC,
    CASE urgency WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END ASC,
    order_index ASC,
    id ASC";

const TASK_UPSERT_SQL: &str = "INSERT INTO tasks (
    id,
    title,
    description,
    importance,
    urgency,
    status,
    due_date,
    tags,
    order_index,
    created_at,
    updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT(id) DO UPDATE SET
    title = excluded.title,
    description = excluded.description,
    importance = excluded.importance,
    urgency = excluded.urgency,
    status = excluded.status,
    due_date = excluded.due_date,
    tags = excluded.tags,
    order_index = excluded.order_index,
    updated_at = excluded.updated_at;";

const REQUIRED_COLUMNS: [&str; 11] = [
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

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required column is missing from the `tasks` table.
    MissingRequiredColumn(&'static str),
}

impl RepoError {
    /// See [`DbError::is_storage_unavailable`].
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_storage_unavailable())
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredColumn(column) => {
                write!(f, "task repository requires column `{column}` in table `tasks`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One atomic write: rows to upsert and ids to delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBatch {
    pub saves: Vec<Task>,
    pub deletes: Vec<TaskId>,
}

impl TaskBatch {
    pub fn is_empty(&self) -> bool {
        self.saves.is_empty() && self.deletes.is_empty()
    }
}

/// Repository interface for task persistence.
pub trait TaskRepository {
    /// Inserts or updates one task by `id` and returns the stored record.
    fn save(&self, task: &Task) -> RepoResult<Task>;
    /// Applies a batch atomically; any failure rolls back the whole batch.
    ///
    /// Deleting an absent id fails with `RepoError::NotFound`.
    fn apply_batch(&self, batch: &TaskBatch) -> RepoResult<()>;
    fn get(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Removes one row; `RepoError::NotFound` when absent.
    fn delete(&self, id: TaskId) -> RepoResult<()>;
    /// Every task ordered by grid cell, then `order_index`.
    fn list_all(&self) -> RepoResult<Vec<Task>>;
    /// Tasks of one cell ordered by `order_index`.
    fn list_cell(&self, cell: Cell) -> RepoResult<Vec<Task>>;
    /// Case-insensitive substring match on title, in grid order.
    fn search_title(&self, text: &str) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_task_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn save(&self, task: &Task) -> RepoResult<Task> {
        upsert_task(self.conn, task)?;
        self.get(task.id)?.ok_or(RepoError::NotFound(task.id))
    }

    fn apply_batch(&self, batch: &TaskBatch) -> RepoResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for id in &batch.deletes {
            delete_task(&tx, *id)?;
        }
        for task in &batch.saves {
            upsert_task(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        delete_task(self.conn, id)
    }

    fn list_all(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} {GRID_ORDER_SQL};"))?;
        let rows = stmt.query([])?;
        collect_tasks(rows)
    }

    fn list_cell(&self, cell: Cell) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE importance = ?1
               AND urgency = ?2
             ORDER BY order_index ASC, id ASC;"
        ))?;
        let rows = stmt.query(params![cell.importance.as_str(), cell.urgency.as_str()])?;
        collect_tasks(rows)
    }

    fn search_title(&self, text: &str) -> RepoResult<Vec<Task>> {
        let needle = text.trim();
        if needle.is_empty() {
            return self.list_all();
        }

        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE title LIKE ?1 ESCAPE '\\'
             {GRID_ORDER_SQL};"
        ))?;
        let rows = stmt.query([format!("%{}%", escape_like(needle))])?;
        collect_tasks(rows)
    }
}

fn upsert_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    task.validate()?;

    conn.execute(
        TASK_UPSERT_SQL,
        params![
            task.id.to_string(),
            task.title.as_str(),
            task.description.as_deref(),
            task.importance.as_str(),
            task.urgency.as_str(),
            task.status.as_str(),
            task.due_date
                .map(|date| date.format(DUE_DATE_FORMAT).to_string()),
            encode_tags(&task.tags)?,
            task.order_index,
            task.created_at.timestamp_millis(),
            task.updated_at.map(|value| value.timestamp_millis()),
        ],
    )?;
    Ok(())
}

fn delete_task(conn: &Connection, id: TaskId) -> RepoResult<()> {
    let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn collect_tasks(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Task>> {
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in tasks.id")))?;

    let importance = parse_level(row.get("importance")?, "tasks.importance")?;
    let urgency = parse_level(row.get("urgency")?, "tasks.urgency")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let due_date = row
        .get::<_, Option<String>>("due_date")?
        .map(|value| {
            NaiveDate::parse_from_str(&value, DUE_DATE_FORMAT).map_err(|_| {
                RepoError::InvalidData(format!("invalid date `{value}` in tasks.due_date"))
            })
        })
        .transpose()?;

    let tags_text: String = row.get("tags")?;
    let tags = decode_tags(&tags_text)?;

    let created_at = parse_millis(row.get("created_at")?, "tasks.created_at")?;
    let updated_at = row
        .get::<_, Option<i64>>("updated_at")?
        .map(|value| parse_millis(value, "tasks.updated_at"))
        .transpose()?;

    let task = Task {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        importance,
        urgency,
        status,
        due_date,
        tags,
        order_index: row.get("order_index")?,
        created_at,
        updated_at,
    };
    task.validate()?;
    Ok(task)
}

fn parse_level(value: String, column: &'static str) -> RepoResult<Level> {
    Level::parse(&value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid level `{value}` in {column}")))
}

fn parse_millis(value: i64, column: &'static str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn encode_tags(tags: &BTreeSet<String>) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tags: {err}")))
}

fn decode_tags(value: &str) -> RepoResult<BTreeSet<String>> {
    serde_json::from_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid tags `{value}` in tasks.tags")))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn ensure_task_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut stmt = conn.prepare("PRAGMA table_info(tasks);")?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }

    for column in REQUIRED_COLUMNS {
        if !columns.iter().any(|current| current == column) {
            return Err(RepoError::MissingRequiredColumn(column));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
    }
}
