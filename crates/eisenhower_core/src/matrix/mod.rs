//! Matrix organizer for the 3x3 importance/urgency grid.
//!
//! # Responsibility
//! - Derive cell placement from `(importance, urgency)`.
//! - Maintain one ordered sequence of task ids per cell.
//!
//! # Invariants
//! - Every placed task id appears in exactly one cell, exactly once.
//! - Positions inside a cell are always `0..n-1` with no gaps.
//! - Rejected operations leave the organizer unchanged.

pub mod organizer;

pub use organizer::{Matrix, MatrixError};
