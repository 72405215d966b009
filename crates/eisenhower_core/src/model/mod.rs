//! Domain model for the task matrix.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the fixed enumerations in one place for storage, import and UI.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Every task belongs to exactly one of the nine matrix cells.

pub mod task;
