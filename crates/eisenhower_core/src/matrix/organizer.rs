//! In-memory cell ordering.
//!
//! Storage keeps `order_index` per row; this type is the single place where
//! those indices are computed. Services load a `Matrix` from stored tasks,
//! apply one operation and write back the tasks whose placement changed.

use crate::model::task::{Cell, Task, TaskId};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from organizer operations. None of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// Task id is not placed on the matrix.
    TaskNotFound(TaskId),
    /// Task id is already placed.
    DuplicateTask(TaskId),
    /// Target index is outside `0..limit` for the cell.
    InvalidPosition {
        cell: Cell,
        index: usize,
        limit: usize,
    },
}

impl Display for MatrixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not on matrix: {id}"),
            Self::DuplicateTask(id) => write!(f, "task already placed: {id}"),
            Self::InvalidPosition { cell, index, limit } => {
                if *limit == 0 {
                    write!(f, "invalid position {index}: cell ({cell}) has no positions")
                } else {
                    write!(
                        f,
                        "invalid position {index}: cell ({cell}) accepts 0..={}",
                        limit - 1
                    )
                }
            }
        }
    }
}

impl Error for MatrixError {}

/// Ordered task ids for each of the nine cells, indexed by
/// `Cell::grid_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    cells: [Vec<TaskId>; 9],
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the organizer from stored tasks.
    ///
    /// Each cell is ordered by stored `order_index`, then id, the same order
    /// `Board` and repository listings use, so gaps or duplicates left by
    /// external edits are compacted. Repeated ids keep their first occurrence.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut buckets: [Vec<&Task>; 9] = Default::default();
        let mut seen = HashSet::new();
        for task in tasks {
            if seen.insert(task.id) {
                buckets[task.cell().grid_index()].push(task);
            }
        }

        let mut matrix = Self::new();
        for (slot, bucket) in matrix.cells.iter_mut().zip(buckets.iter_mut()) {
            bucket.sort_by(|left, right| {
                left.order_index
                    .cmp(&right.order_index)
                    .then_with(|| left.id.cmp(&right.id))
            });
            *slot = bucket.iter().map(|task| task.id).collect();
        }
        matrix
    }

    /// Total number of placed tasks.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Ordered ids of one cell.
    pub fn cell(&self, cell: Cell) -> &[TaskId] {
        &self.cells[cell.grid_index()]
    }

    /// Iterates cells in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &[TaskId])> + '_ {
        Cell::ALL
            .into_iter()
            .map(move |cell| (cell, self.cells[cell.grid_index()].as_slice()))
    }

    /// Returns cell and position of a placed task.
    pub fn locate(&self, id: TaskId) -> Option<(Cell, usize)> {
        Cell::ALL.into_iter().find_map(|cell| {
            self.cells[cell.grid_index()]
                .iter()
                .position(|candidate| *candidate == id)
                .map(|index| (cell, index))
        })
    }

    pub fn cell_of(&self, id: TaskId) -> Option<Cell> {
        self.locate(id).map(|(cell, _)| cell)
    }

    pub fn index_of(&self, id: TaskId) -> Option<usize> {
        self.locate(id).map(|(_, index)| index)
    }

    /// Appends a task to the end of `cell` and returns its position.
    pub fn place(&mut self, id: TaskId, cell: Cell) -> Result<usize, MatrixError> {
        if self.locate(id).is_some() {
            return Err(MatrixError::DuplicateTask(id));
        }
        let slot = &mut self.cells[cell.grid_index()];
        slot.push(id);
        Ok(slot.len() - 1)
    }

    /// Moves a task to `index` of `to`, renumbering source and destination.
    ///
    /// `index` must be within `0..=n` where `n` counts the destination
    /// cell without the moved task. Moving onto the current position is a
    /// no-op.
    pub fn move_task(&mut self, id: TaskId, to: Cell, index: usize) -> Result<(), MatrixError> {
        let (from, current) = self.locate(id).ok_or(MatrixError::TaskNotFound(id))?;

        let destination_count = if from == to {
            self.cells[to.grid_index()].len() - 1
        } else {
            self.cells[to.grid_index()].len()
        };
        if index > destination_count {
            return Err(MatrixError::InvalidPosition {
                cell: to,
                index,
                limit: destination_count + 1,
            });
        }

        if from == to && current == index {
            return Ok(());
        }

        self.cells[from.grid_index()].remove(current);
        self.cells[to.grid_index()].insert(index, id);
        Ok(())
    }

    /// Moves the task at `old_index` to `new_index` inside one cell.
    ///
    /// Tasks between the two positions shift by one.
    pub fn reorder(
        &mut self,
        cell: Cell,
        old_index: usize,
        new_index: usize,
    ) -> Result<TaskId, MatrixError> {
        let slot = &mut self.cells[cell.grid_index()];
        let limit = slot.len();
        for index in [old_index, new_index] {
            if index >= limit {
                return Err(MatrixError::InvalidPosition { cell, index, limit });
            }
        }

        let id = slot.remove(old_index);
        slot.insert(new_index, id);
        Ok(id)
    }

    /// Removes a task and compacts its cell. Returns the cell it left.
    pub fn remove(&mut self, id: TaskId) -> Result<Cell, MatrixError> {
        let (cell, index) = self.locate(id).ok_or(MatrixError::TaskNotFound(id))?;
        self.cells[cell.grid_index()].remove(index);
        Ok(cell)
    }

    /// Writes organizer placement into task records.
    ///
    /// Returns ids whose cell or `order_index` changed. Tasks that are not
    /// placed on the matrix are left untouched.
    pub fn assign_positions(&self, tasks: &mut [Task]) -> Vec<TaskId> {
        let mut changed = Vec::new();
        for task in tasks.iter_mut() {
            let Some((cell, index)) = self.locate(task.id) else {
                continue;
            };
            let index = index as i64;
            if task.cell() != cell || task.order_index != index {
                task.set_cell(cell);
                task.order_index = index;
                changed.push(task.id);
            }
        }
        changed
    }
}
