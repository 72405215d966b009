//! Core domain logic for the Eisenhower 3x3 task matrix.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod matrix;
pub mod model;
pub mod repo;
pub mod service;
pub mod shell;
pub mod transfer;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use matrix::{Matrix, MatrixError};
pub use model::task::{Cell, Level, Task, TaskDraft, TaskId, TaskStatus, TaskValidationError};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskBatch, TaskRepository};
pub use service::board::Board;
pub use service::task_service::{
    DuplicatePolicy, ImportOutcome, ServiceError, ServiceResult, TaskService,
};
pub use shell::{EventHandler, Shell, ShellEvent, ShellOutcome};
pub use transfer::{FileFormat, ImportReport, SkippedRow, TransferError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
