//! Board read model: the nine cells with their ordered tasks.

use crate::model::task::{Cell, Task, TaskId};

/// Snapshot of the matrix as rendered by the UI shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Vec<Task>; 9],
}

impl Board {
    /// Groups tasks by cell, ordered by `order_index` then id.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            board.cells[task.cell().grid_index()].push(task);
        }
        for cell in &mut board.cells {
            cell.sort_by(|left, right| {
                left.order_index
                    .cmp(&right.order_index)
                    .then_with(|| left.id.cmp(&right.id))
            });
        }
        board
    }

    pub fn cell(&self, cell: Cell) -> &[Task] {
        &self.cells[cell.grid_index()]
    }

    /// Iterates cells in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &[Task])> + '_ {
        Cell::ALL
            .into_iter()
            .map(move |cell| (cell, self.cells[cell.grid_index()].as_slice()))
    }

    /// All tasks in grid order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.cells.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    pub fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks().find(|task| task.id == id)
    }

    /// Keeps tasks whose title contains `needle`, ignoring case.
    ///
    /// A blank needle keeps everything. Cell order is preserved.
    pub fn filtered(&self, needle: &str) -> Board {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let mut board = Self::default();
        for (slot, cell) in board.cells.iter_mut().zip(self.cells.iter()) {
            *slot = cell
                .iter()
                .filter(|task| task.title.to_lowercase().contains(&needle))
                .cloned()
                .collect();
        }
        board
    }
}
