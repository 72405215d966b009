//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate organizer + repository calls into use-case level APIs.
//! - Keep UI shell layers decoupled from storage details.

pub mod board;
pub mod task_service;
