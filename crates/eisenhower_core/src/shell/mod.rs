//! UI shell event handling.
//!
//! # Responsibility
//! - Translate user actions (add/edit/delete/drag/search/export/import)
//!   into task service calls.
//! - Keep the last good board snapshot for rendering.
//! - Classify failures: inline rejections vs recoverable storage errors.
//!
//! # Invariants
//! - A failed event never replaces the retained board.
//! - Rejected events perform no writes.
//! - Search only filters the rendered board; stored order is unchanged.

use crate::model::task::{Cell, TaskDraft, TaskId, TaskStatus};
use crate::repo::task_repo::TaskRepository;
use crate::service::board::Board;
use crate::service::task_service::{DuplicatePolicy, ServiceError, TaskService};
use crate::transfer::{self, FileFormat, SkippedRow};
use log::{debug, warn};
use std::path::PathBuf;

/// User action dispatched by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Add(TaskDraft),
    Edit { id: TaskId, draft: TaskDraft },
    Delete(TaskId),
    /// Drag a task onto `index` of `to`.
    Drag { id: TaskId, to: Cell, index: usize },
    Reorder { cell: Cell, from: usize, to: usize },
    SetStatus { id: TaskId, status: TaskStatus },
    /// Title filter for the rendered board; blank clears it.
    Search(String),
    Export { path: PathBuf, format: FileFormat },
    /// `format: None` infers the format from the file extension.
    Import {
        path: PathBuf,
        format: Option<FileFormat>,
        policy: DuplicatePolicy,
    },
    Refresh,
}

impl ShellEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Edit { .. } => "edit",
            Self::Delete(_) => "delete",
            Self::Drag { .. } => "drag",
            Self::Reorder { .. } => "reorder",
            Self::SetStatus { .. } => "set_status",
            Self::Search(_) => "search",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
            Self::Refresh => "refresh",
        }
    }
}

/// Result of handling one event, for display by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    /// Event applied; board refreshed.
    Updated(String),
    /// Input or position was invalid; nothing changed.
    Rejected(String),
    /// Store unavailable or failed; board retained, not retried.
    StorageError(String),
    /// Export/import file could not be written or read.
    FileError(String),
    /// Import finished; per-row failures are listed, not fatal.
    Imported {
        inserted: usize,
        replaced: usize,
        skipped_duplicates: usize,
        skipped_rows: Vec<SkippedRow>,
    },
}

impl ShellOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Updated(_) | Self::Imported { .. })
    }
}

/// Callback seam between a front end and the core.
pub trait EventHandler {
    fn handle(&mut self, event: ShellEvent) -> ShellOutcome;
}

/// Stateful shell over the task service.
pub struct Shell<R: TaskRepository> {
    service: TaskService<R>,
    board: Board,
    filter: String,
}

impl<R: TaskRepository> Shell<R> {
    /// Creates a shell with an empty board; dispatch `ShellEvent::Refresh`
    /// to load it.
    pub fn new(service: TaskService<R>) -> Self {
        Self {
            service,
            board: Board::default(),
            filter: String::new(),
        }
    }

    /// Board as rendered: the retained snapshot with the search filter.
    pub fn board(&self) -> Board {
        self.board.filtered(&self.filter)
    }

    /// Unfiltered retained snapshot.
    pub fn snapshot(&self) -> &Board {
        &self.board
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn service(&self) -> &TaskService<R> {
        &self.service
    }

    fn dispatch(&mut self, event: ShellEvent) -> ShellOutcome {
        let result = match event {
            ShellEvent::Add(draft) => self
                .service
                .create_task(&draft)
                .map(|task| format!("Task created: {}", task.id)),
            ShellEvent::Edit { id, draft } => self
                .service
                .update_task(id, &draft)
                .map(|task| format!("Task updated: {}", task.id)),
            ShellEvent::Delete(id) => self
                .service
                .delete_task(id)
                .map(|()| format!("Task deleted: {id}")),
            ShellEvent::Drag { id, to, index } => self
                .service
                .move_task(id, to, index)
                .map(|task| format!("Task moved to ({to}) position {}", task.order_index)),
            ShellEvent::Reorder { cell, from, to } => self
                .service
                .reorder(cell, from, to)
                .map(|_| format!("Cell ({cell}) reordered: {from} -> {to}")),
            ShellEvent::SetStatus { id, status } => self
                .service
                .set_status(id, status)
                .map(|task| format!("Task {} marked {}", task.id, task.status)),
            ShellEvent::Search(text) => {
                self.filter = text.trim().to_string();
                let visible = self.board().len();
                return ShellOutcome::Updated(format!("{visible} task(s) match"));
            }
            ShellEvent::Export { path, format } => return self.export(path, format),
            ShellEvent::Import {
                path,
                format,
                policy,
            } => return self.import(path, format, policy),
            ShellEvent::Refresh => Ok("Board refreshed".to_string()),
        };

        match result {
            Ok(message) => match self.refresh() {
                Ok(()) => ShellOutcome::Updated(message),
                Err(err) => classify(err),
            },
            Err(err) => classify(err),
        }
    }

    fn export(&mut self, path: PathBuf, format: FileFormat) -> ShellOutcome {
        let tasks = match self.service.list_tasks() {
            Ok(tasks) => tasks,
            Err(err) => return classify(err),
        };
        match transfer::export(&tasks, &path, format) {
            Ok(rows) => ShellOutcome::Updated(format!(
                "Exported {rows} task(s) to {}",
                path.display()
            )),
            Err(err) => ShellOutcome::FileError(format!("export failed: {err}")),
        }
    }

    fn import(
        &mut self,
        path: PathBuf,
        format: Option<FileFormat>,
        policy: DuplicatePolicy,
    ) -> ShellOutcome {
        let parsed = match format {
            Some(format) => transfer::import_as(&path, format),
            None => transfer::import(&path),
        };
        let report = match parsed {
            Ok(report) => report,
            Err(err) => return ShellOutcome::FileError(format!("import failed: {err}")),
        };
        let outcome = match self.service.import_tasks(report.tasks, policy) {
            Ok(outcome) => outcome,
            Err(err) => return classify(err),
        };
        if let Err(err) = self.refresh() {
            return classify(err);
        }
        ShellOutcome::Imported {
            inserted: outcome.inserted,
            replaced: outcome.replaced,
            skipped_duplicates: outcome.skipped_duplicates.len(),
            skipped_rows: report.skipped,
        }
    }

    fn refresh(&mut self) -> Result<(), ServiceError> {
        self.board = self.service.board()?;
        Ok(())
    }
}

impl<R: TaskRepository> EventHandler for Shell<R> {
    fn handle(&mut self, event: ShellEvent) -> ShellOutcome {
        let kind = event.kind();
        debug!("event=shell_event module=shell status=start kind={kind}");
        let outcome = self.dispatch(event);
        match &outcome {
            ShellOutcome::StorageError(_) | ShellOutcome::FileError(_) => {
                warn!("event=shell_event module=shell status=error kind={kind}")
            }
            ShellOutcome::Rejected(_) => {
                debug!("event=shell_event module=shell status=rejected kind={kind}")
            }
            _ => debug!("event=shell_event module=shell status=ok kind={kind}"),
        }
        outcome
    }
}

fn classify(err: ServiceError) -> ShellOutcome {
    match err {
        ServiceError::Validation(_) | ServiceError::Matrix(_) | ServiceError::NotFound(_) => {
            ShellOutcome::Rejected(err.to_string())
        }
        ServiceError::Repo(_) if err.is_storage_unavailable() => {
            ShellOutcome::StorageError(format!("storage unavailable: {err}"))
        }
        ServiceError::Repo(_) => ShellOutcome::StorageError(format!("storage error: {err}")),
    }
}
