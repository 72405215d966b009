//! Task use-case service.
//!
//! # Responsibility
//! - Validate form input above the repository layer.
//! - Route every placement change through the matrix organizer.
//! - Persist each use case as one atomic repository batch.
//!
//! # Invariants
//! - After any successful call, `order_index` is `0..n-1` in every cell.
//! - Rejected calls (validation, invalid position, not found) write nothing.
//! - Service layer remains storage-agnostic.

use crate::matrix::{Matrix, MatrixError};
use crate::model::task::{Cell, Task, TaskDraft, TaskId, TaskStatus, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskBatch, TaskRepository};
use crate::service::board::Board;
use log::info;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from task service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Form input failed validation.
    Validation(TaskValidationError),
    /// Organizer rejected the placement.
    Matrix(MatrixError),
    /// Target task does not exist.
    NotFound(TaskId),
    /// Repository-level failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Whether the failure came from an unavailable store rather than input.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::Repo(err) if err.is_storage_unavailable())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Matrix(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Matrix(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for ServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MatrixError> for ServiceError {
    fn from(value: MatrixError) -> Self {
        match value {
            MatrixError::TaskNotFound(id) => Self::NotFound(id),
            other => Self::Matrix(other),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// What to do with imported rows whose id is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the stored task and drop the imported row.
    #[default]
    Skip,
    /// Replace the stored task with the imported row.
    Overwrite,
}

/// Summary of one import batch written to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Newly inserted tasks.
    pub inserted: usize,
    /// Stored tasks replaced under `DuplicatePolicy::Overwrite`.
    pub replaced: usize,
    /// Ids dropped under `DuplicatePolicy::Skip`.
    pub skipped_duplicates: Vec<TaskId>,
}

/// Task service facade.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task at the end of its target cell.
    pub fn create_task(&self, draft: &TaskDraft) -> ServiceResult<Task> {
        let mut task = Task::new(draft.title.trim(), draft.cell());
        draft.apply_to(&mut task)?;

        let mut tasks = self.repo.list_all()?;
        let mut matrix = Matrix::from_tasks(&tasks);
        let index = matrix.place(task.id, task.cell())?;
        let id = task.id;
        tasks.push(task);

        self.persist(&matrix, &mut tasks, &[id], Vec::new())?;
        info!(
            "event=task_create module=service status=ok cell={} order_index={index}",
            draft.cell().grid_index()
        );
        take_task(tasks, id)
    }

    /// Applies an edit form to an existing task.
    ///
    /// A cell change appends the task to the destination cell and
    /// renumbers the source cell.
    pub fn update_task(&self, id: TaskId, draft: &TaskDraft) -> ServiceResult<Task> {
        let mut tasks = self.repo.list_all()?;
        let position = find_position(&tasks, id)?;

        let mut edited = tasks[position].clone();
        draft.apply_to(&mut edited)?;
        edited.touch();

        let mut matrix = Matrix::from_tasks(&tasks);
        let target = edited.cell();
        if matrix.cell_of(id) != Some(target) {
            let append_at = matrix.cell(target).len();
            matrix.move_task(id, target, append_at)?;
        }
        tasks[position] = edited;

        self.persist(&matrix, &mut tasks, &[id], Vec::new())?;
        info!(
            "event=task_update module=service status=ok cell={}",
            target.grid_index()
        );
        take_task(tasks, id)
    }

    /// Moves a task to `index` of `to` (drag and drop between or inside
    /// cells).
    pub fn move_task(&self, id: TaskId, to: Cell, index: usize) -> ServiceResult<Task> {
        let mut tasks = self.repo.list_all()?;
        let position = find_position(&tasks, id)?;
        let mut matrix = Matrix::from_tasks(&tasks);

        if matrix.locate(id) == Some((to, index)) {
            return Ok(tasks.swap_remove(position));
        }
        matrix.move_task(id, to, index)?;
        tasks[position].touch();

        self.persist(&matrix, &mut tasks, &[id], Vec::new())?;
        info!(
            "event=task_move module=service status=ok cell={} order_index={index}",
            to.grid_index()
        );
        take_task(tasks, id)
    }

    /// Moves the task at `old_index` to `new_index` inside one cell.
    pub fn reorder(&self, cell: Cell, old_index: usize, new_index: usize) -> ServiceResult<TaskId> {
        let mut tasks = self.repo.list_all()?;
        let mut matrix = Matrix::from_tasks(&tasks);
        let id = matrix.reorder(cell, old_index, new_index)?;
        if old_index == new_index {
            return Ok(id);
        }

        if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
            task.touch();
        }
        self.persist(&matrix, &mut tasks, &[id], Vec::new())?;
        info!(
            "event=task_reorder module=service status=ok cell={} from={old_index} to={new_index}",
            cell.grid_index()
        );
        Ok(id)
    }

    /// Changes task status without touching placement.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> ServiceResult<Task> {
        let mut task = self.repo.get(id)?.ok_or(ServiceError::NotFound(id))?;
        if task.status == status {
            return Ok(task);
        }
        task.status = status;
        task.touch();
        let stored = self.repo.save(&task)?;
        info!(
            "event=task_status module=service status=ok task_status={}",
            status.as_str()
        );
        Ok(stored)
    }

    /// Deletes a task and renumbers the cell it left.
    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        let mut tasks = self.repo.list_all()?;
        let mut matrix = Matrix::from_tasks(&tasks);
        let cell = matrix.remove(id)?;
        tasks.retain(|task| task.id != id);

        self.persist(&matrix, &mut tasks, &[], vec![id])?;
        info!(
            "event=task_delete module=service status=ok cell={} remaining={}",
            cell.grid_index(),
            matrix.cell(cell).len()
        );
        Ok(())
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Option<Task>> {
        self.repo.get(id).map_err(Into::into)
    }

    /// Every task in grid order.
    pub fn list_tasks(&self) -> ServiceResult<Vec<Task>> {
        self.repo.list_all().map_err(Into::into)
    }

    /// Title search in grid order; blank text lists everything.
    pub fn search(&self, text: &str) -> ServiceResult<Vec<Task>> {
        self.repo.search_title(text).map_err(Into::into)
    }

    /// Loads the full board snapshot.
    pub fn board(&self) -> ServiceResult<Board> {
        Ok(Board::from_tasks(self.repo.list_all()?))
    }

    /// Stores imported tasks in one batch.
    ///
    /// Rows are appended to their cells in `order_index` order (file order
    /// on ties), so a re-imported export keeps its per-cell ordering.
    /// Under `Overwrite`, a replaced task keeps its position when its cell
    /// is unchanged and is appended to the new cell otherwise.
    pub fn import_tasks(
        &self,
        imported: Vec<Task>,
        policy: DuplicatePolicy,
    ) -> ServiceResult<ImportOutcome> {
        let mut tasks = self.repo.list_all()?;
        let mut matrix = Matrix::from_tasks(&tasks);
        let mut positions: HashMap<TaskId, usize> = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.id, position))
            .collect();

        let mut incoming = imported;
        incoming.sort_by_key(|task| (task.cell().grid_index(), task.order_index));

        let mut outcome = ImportOutcome::default();
        let mut touched = Vec::new();
        for task in incoming {
            task.validate()?;
            let id = task.id;
            match positions.get(&id).copied() {
                Some(_) if policy == DuplicatePolicy::Skip => {
                    outcome.skipped_duplicates.push(id);
                }
                Some(position) => {
                    if matrix.cell_of(id) != Some(task.cell()) {
                        let append_at = matrix.cell(task.cell()).len();
                        matrix.move_task(id, task.cell(), append_at)?;
                    }
                    tasks[position] = task;
                    touched.push(id);
                    outcome.replaced += 1;
                }
                None => {
                    matrix.place(id, task.cell())?;
                    positions.insert(id, tasks.len());
                    tasks.push(task);
                    touched.push(id);
                    outcome.inserted += 1;
                }
            }
        }

        if !touched.is_empty() {
            self.persist(&matrix, &mut tasks, &touched, Vec::new())?;
        }
        info!(
            "event=task_import module=service status=ok inserted={} replaced={} skipped_duplicates={}",
            outcome.inserted,
            outcome.replaced,
            outcome.skipped_duplicates.len()
        );
        Ok(outcome)
    }

    /// Writes organizer placement back to records and saves every changed
    /// row plus `touched` ids, with `deletes`, in one batch.
    ///
    /// Only the write is transactional: callers load with `list_all()`
    /// before the batch opens, so the store must have a single writer.
    fn persist(
        &self,
        matrix: &Matrix,
        tasks: &mut [Task],
        touched: &[TaskId],
        deletes: Vec<TaskId>,
    ) -> ServiceResult<()> {
        let mut changed: HashSet<TaskId> = matrix.assign_positions(tasks).into_iter().collect();
        changed.extend(touched.iter().copied());

        let batch = TaskBatch {
            saves: tasks
                .iter()
                .filter(|task| changed.contains(&task.id))
                .cloned()
                .collect(),
            deletes,
        };
        self.repo.apply_batch(&batch)?;
        Ok(())
    }
}

fn find_position(tasks: &[Task], id: TaskId) -> ServiceResult<usize> {
    tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or(ServiceError::NotFound(id))
}

fn take_task(tasks: Vec<Task>, id: TaskId) -> ServiceResult<Task> {
    tasks
        .into_iter()
        .find(|task| task.id == id)
        .ok_or(ServiceError::NotFound(id))
}
