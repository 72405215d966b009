//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record placed on the 3x3 matrix.
//! - Define the fixed enumerations (importance/urgency level, status).
//! - Normalize and validate user-entered task fields.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `(importance, urgency)` always resolves to exactly one `Cell`.
//! - `title` is non-empty after trim.
//! - `tags` are trimmed, non-empty and at most `MAX_TAG_CHARS` long.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for every task.
pub type TaskId = Uuid;

/// Upper bound for one tag label, counted in chars.
pub const MAX_TAG_CHARS: usize = 32;

/// Text format used for `due_date` in storage and export files.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

static TAG_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Shared three-valued scale for importance and urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a case-insensitive level name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Medium
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = TaskValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TaskValidationError::InvalidLevel(s.trim().to_string()))
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Created but not started.
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parses a case-insensitive status name.
    ///
    /// Accepts `in-progress` and `in progress` as aliases of `in_progress`.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TaskValidationError::InvalidStatus(s.trim().to_string()))
    }
}

/// One of the nine `(importance, urgency)` combinations of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub importance: Level,
    pub urgency: Level,
}

impl Cell {
    /// All cells in grid order: rows importance high -> low, columns
    /// urgency low -> high.
    pub const ALL: [Cell; 9] = [
        Cell::new(Level::High, Level::Low),
        Cell::new(Level::High, Level::Medium),
        Cell::new(Level::High, Level::High),
        Cell::new(Level::Medium, Level::Low),
        Cell::new(Level::Medium, Level::Medium),
        Cell::new(Level::Medium, Level::High),
        Cell::new(Level::Low, Level::Low),
        Cell::new(Level::Low, Level::Medium),
        Cell::new(Level::Low, Level::High),
    ];

    pub const fn new(importance: Level, urgency: Level) -> Self {
        Self {
            importance,
            urgency,
        }
    }

    /// Position of this cell in `Cell::ALL`.
    pub fn grid_index(self) -> usize {
        let row = match self.importance {
            Level::High => 0,
            Level::Medium => 1,
            Level::Low => 2,
        };
        let column = match self.urgency {
            Level::Low => 0,
            Level::Medium => 1,
            Level::High => 2,
        };
        row * 3 + column
    }

    pub fn from_grid_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(Level::Medium, Level::Medium)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "importance={} urgency={}",
            self.importance, self.urgency
        )
    }
}

/// Validation failures for task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
    EmptyTitle,
    EmptyTag,
    TagTooLong { tag: String, max_chars: usize },
    NegativeOrderIndex(i64),
    InvalidLevel(String),
    InvalidStatus(String),
    InvalidDueDate(String),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
            Self::EmptyTitle => write!(f, "title is required"),
            Self::EmptyTag => write!(f, "tags must not be blank"),
            Self::TagTooLong { tag, max_chars } => {
                write!(f, "tag `{tag}` is longer than {max_chars} characters")
            }
            Self::NegativeOrderIndex(value) => {
                write!(f, "order_index must not be negative, got {value}")
            }
            Self::InvalidLevel(value) => {
                write!(f, "invalid level `{value}`; expected low|medium|high")
            }
            Self::InvalidStatus(value) => write!(
                f,
                "invalid status `{value}`; expected todo|in_progress|completed"
            ),
            Self::InvalidDueDate(value) => {
                write!(f, "invalid due date `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub importance: Level,
    pub urgency: Level,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    /// Position inside the task's cell. Maintained by the matrix organizer.
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    /// `None` until the first edit.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new task with a generated stable ID in the given cell.
    pub fn new(title: impl Into<String>, cell: Cell) -> Self {
        Self::with_id(Uuid::new_v4(), title, cell)
    }

    /// Creates a task with a caller-provided ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: TaskId, title: impl Into<String>, cell: Cell) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            importance: cell.importance,
            urgency: cell.urgency,
            status: TaskStatus::Todo,
            due_date: None,
            tags: BTreeSet::new(),
            order_index: 0,
            created_at: now_millis(),
            updated_at: None,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.importance, self.urgency)
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.importance = cell.importance;
        self.urgency = cell.urgency;
    }

    /// Stamps `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = Some(now_millis());
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if self.order_index < 0 {
            return Err(TaskValidationError::NegativeOrderIndex(self.order_index));
        }
        for tag in &self.tags {
            validate_tag(tag)?;
        }
        Ok(())
    }
}

/// User-entered task fields, as submitted by an add/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub importance: Level,
    pub urgency: Level,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, cell: Cell) -> Self {
        Self {
            title: title.into(),
            importance: cell.importance,
            urgency: cell.urgency,
            ..Self::default()
        }
    }

    /// Builds a draft pre-filled from an existing task, for edit forms.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            importance: task.importance,
            urgency: task.urgency,
            status: task.status,
            due_date: task.due_date,
            tags: task.tags.iter().cloned().collect(),
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.importance, self.urgency)
    }

    /// Normalizes the draft and writes its fields into `task`.
    ///
    /// Identity, placement order and timestamps are left untouched; the
    /// caller owns cell placement.
    pub fn apply_to(&self, task: &mut Task) -> Result<(), TaskValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        let tags = normalize_tags(&self.tags)?;

        task.title = title.to_string();
        task.description = normalize_description(self.description.as_deref());
        task.importance = self.importance;
        task.urgency = self.urgency;
        task.status = self.status;
        task.due_date = self.due_date;
        task.tags = tags;
        Ok(())
    }
}

/// Parses a `YYYY-MM-DD` due date.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, TaskValidationError> {
    NaiveDate::parse_from_str(value.trim(), DUE_DATE_FORMAT)
        .map_err(|_| TaskValidationError::InvalidDueDate(value.trim().to_string()))
}

/// Trims labels, collapses inner whitespace and drops duplicates.
pub fn normalize_tags<S: AsRef<str>>(
    tags: impl IntoIterator<Item = S>,
) -> Result<BTreeSet<String>, TaskValidationError> {
    let mut normalized = BTreeSet::new();
    for tag in tags {
        let tag = TAG_WHITESPACE
            .replace_all(tag.as_ref().trim(), " ")
            .into_owned();
        validate_tag(&tag)?;
        normalized.insert(tag);
    }
    Ok(normalized)
}

fn validate_tag(tag: &str) -> Result<(), TaskValidationError> {
    if tag.trim().is_empty() {
        return Err(TaskValidationError::EmptyTag);
    }
    if tag.chars().count() > MAX_TAG_CHARS {
        return Err(TaskValidationError::TagTooLong {
            tag: tag.to_string(),
            max_chars: MAX_TAG_CHARS,
        });
    }
    Ok(())
}

fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Current time truncated to millisecond precision, matching storage.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
