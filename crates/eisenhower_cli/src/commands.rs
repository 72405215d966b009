//! Command execution against the shell.
//!
//! Every mutating command is dispatched as a `ShellEvent`, so one-shot
//! commands and the interactive session share the same outcome handling.

use crate::cli::Command;
use crate::render;
use anyhow::{anyhow, bail, Result};
use eisenhower_core::{
    Board, Cell, DuplicatePolicy, EventHandler, FileFormat, Shell, ShellEvent, ShellOutcome,
    TaskDraft, TaskId, TaskRepository,
};
use std::io::Write;
use uuid::Uuid;

const MIN_ID_PREFIX_CHARS: usize = 4;

pub fn execute<R: TaskRepository>(
    shell: &mut Shell<R>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Add {
            title,
            importance,
            urgency,
            description,
            status,
            due,
            tags,
        } => {
            let mut draft = TaskDraft::new(title, Cell::new(importance, urgency));
            draft.description = description;
            draft.status = status;
            draft.due_date = due;
            draft.tags = tags;
            report(shell.handle(ShellEvent::Add(draft)), out)
        }
        Command::Edit {
            id,
            title,
            description,
            clear_description,
            importance,
            urgency,
            status,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let id = resolve_task(shell.snapshot(), &id)?;
            let current = shell
                .snapshot()
                .find(id)
                .ok_or_else(|| anyhow!("task not found: {id}"))?;
            let mut draft = TaskDraft::from_task(current);
            if let Some(title) = title {
                draft.title = title;
            }
            if clear_description {
                draft.description = None;
            } else if description.is_some() {
                draft.description = description;
            }
            if let Some(importance) = importance {
                draft.importance = importance;
            }
            if let Some(urgency) = urgency {
                draft.urgency = urgency;
            }
            if let Some(status) = status {
                draft.status = status;
            }
            if clear_due {
                draft.due_date = None;
            } else if due.is_some() {
                draft.due_date = due;
            }
            if clear_tags {
                draft.tags.clear();
            } else if !tags.is_empty() {
                draft.tags = tags;
            }
            report(shell.handle(ShellEvent::Edit { id, draft }), out)
        }
        Command::Status { id, status } => {
            let id = resolve_task(shell.snapshot(), &id)?;
            report(shell.handle(ShellEvent::SetStatus { id, status }), out)
        }
        Command::Move {
            id,
            importance,
            urgency,
            index,
        } => {
            let id = resolve_task(shell.snapshot(), &id)?;
            let to = Cell::new(importance, urgency);
            let index = index.unwrap_or_else(|| {
                shell
                    .snapshot()
                    .cell(to)
                    .iter()
                    .filter(|task| task.id != id)
                    .count()
            });
            report(shell.handle(ShellEvent::Drag { id, to, index }), out)
        }
        Command::Reorder {
            importance,
            urgency,
            from,
            to,
        } => {
            let cell = Cell::new(importance, urgency);
            report(shell.handle(ShellEvent::Reorder { cell, from, to }), out)
        }
        Command::Delete { id } => {
            let id = resolve_task(shell.snapshot(), &id)?;
            report(shell.handle(ShellEvent::Delete(id)), out)
        }
        Command::Board => {
            if !shell.filter().is_empty() {
                writeln!(out, "filter: {}", shell.filter())?;
            }
            render::write_board(&shell.board(), out)?;
            Ok(())
        }
        Command::List {
            importance,
            urgency,
            status,
        } => {
            let board = shell.snapshot();
            let tasks = board.tasks().filter(|task| {
                importance.map_or(true, |level| task.importance == level)
                    && urgency.map_or(true, |level| task.urgency == level)
                    && status.map_or(true, |value| task.status == value)
            });
            render::write_list(tasks, out)?;
            Ok(())
        }
        Command::Search { text } => {
            report(shell.handle(ShellEvent::Search(text)), out)?;
            render::write_board(&shell.board(), out)?;
            Ok(())
        }
        Command::Export { path, format } => {
            let format = match format {
                Some(format) => format,
                None => FileFormat::from_path(&path).ok_or_else(|| {
                    anyhow!(
                        "cannot infer format from `{}`; pass --format csv|xlsx",
                        path.display()
                    )
                })?,
            };
            report(shell.handle(ShellEvent::Export { path, format }), out)
        }
        Command::Import {
            path,
            format,
            overwrite,
        } => {
            let policy = if overwrite {
                DuplicatePolicy::Overwrite
            } else {
                DuplicatePolicy::Skip
            };
            report(
                shell.handle(ShellEvent::Import {
                    path,
                    format,
                    policy,
                }),
                out,
            )
        }
        Command::Shell => bail!("already in an interactive session"),
    }
}

/// Writes a successful outcome; turns failures into errors.
pub fn report(outcome: ShellOutcome, out: &mut impl Write) -> Result<()> {
    match outcome {
        ShellOutcome::Updated(message) => {
            writeln!(out, "{message}")?;
            Ok(())
        }
        ShellOutcome::Imported {
            inserted,
            replaced,
            skipped_duplicates,
            skipped_rows,
        } => {
            writeln!(
                out,
                "Imported {inserted} new, {replaced} replaced, {skipped_duplicates} duplicate(s) skipped, {} invalid row(s)",
                skipped_rows.len()
            )?;
            for skipped in skipped_rows {
                writeln!(out, "  row {}: {}", skipped.row, skipped.reason)?;
            }
            Ok(())
        }
        ShellOutcome::Rejected(message) => bail!("rejected: {message}"),
        ShellOutcome::StorageError(message) | ShellOutcome::FileError(message) => bail!(message),
    }
}

/// Accepts a full id or a unique prefix of at least four characters.
pub fn resolve_task(board: &Board, text: &str) -> Result<TaskId> {
    let text = text.trim();
    if let Ok(id) = Uuid::parse_str(text) {
        return Ok(id);
    }
    if text.chars().count() < MIN_ID_PREFIX_CHARS {
        bail!("task id `{text}` is too short; use at least {MIN_ID_PREFIX_CHARS} characters");
    }

    let needle = text.to_ascii_lowercase();
    let mut matches = board
        .tasks()
        .filter(|task| task.id.to_string().starts_with(&needle))
        .map(|task| task.id);
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => bail!("no task matches id `{text}`"),
        (Some(_), Some(_)) => bail!("id `{text}` is ambiguous"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eisenhower_core::db::open_db_in_memory;
    use eisenhower_core::{Level, SqliteTaskRepository, TaskService, TaskStatus};
    use rusqlite::Connection;

    const HIGH_HIGH: Cell = Cell::new(Level::High, Level::High);

    fn open_shell(conn: &Connection) -> Shell<SqliteTaskRepository<'_>> {
        let mut shell = Shell::new(TaskService::new(SqliteTaskRepository::try_new(conn).unwrap()));
        report(shell.handle(ShellEvent::Refresh), &mut Vec::new()).unwrap();
        shell
    }

    fn add(title: &str) -> Command {
        Command::Add {
            title: title.to_string(),
            importance: Level::High,
            urgency: Level::High,
            description: None,
            status: TaskStatus::Todo,
            due: None,
            tags: Vec::new(),
        }
    }

    fn titles(shell: &Shell<SqliteTaskRepository<'_>>) -> Vec<String> {
        shell
            .snapshot()
            .cell(HIGH_HIGH)
            .iter()
            .map(|task| task.title.clone())
            .collect()
    }

    #[test]
    fn move_without_index_appends() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        let mut out = Vec::new();
        for title in ["A", "B", "C"] {
            execute(&mut shell, add(title), &mut out).unwrap();
        }
        let first = shell.snapshot().cell(HIGH_HIGH)[0].id.to_string();

        execute(
            &mut shell,
            Command::Move {
                id: first[..8].to_string(),
                importance: Level::High,
                urgency: Level::High,
                index: None,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(titles(&shell), ["B", "C", "A"]);
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        let mut out = Vec::new();
        execute(&mut shell, add("A"), &mut out).unwrap();
        let id = shell.snapshot().cell(HIGH_HIGH)[0].id;

        execute(
            &mut shell,
            Command::Edit {
                id: id.to_string(),
                title: None,
                description: Some("notes".to_string()),
                clear_description: false,
                importance: None,
                urgency: Some(Level::Low),
                status: None,
                due: None,
                clear_due: false,
                tags: vec!["errand".to_string()],
                clear_tags: false,
            },
            &mut out,
        )
        .unwrap();

        let task = shell.snapshot().find(id).unwrap();
        assert_eq!(task.title, "A");
        assert_eq!(task.description.as_deref(), Some("notes"));
        assert_eq!(task.cell(), Cell::new(Level::High, Level::Low));
        assert!(task.tags.contains("errand"));
    }

    #[test]
    fn rejected_outcome_becomes_error() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        let mut out = Vec::new();
        execute(&mut shell, add("A"), &mut out).unwrap();

        let err = execute(
            &mut shell,
            Command::Reorder {
                importance: Level::High,
                urgency: Level::High,
                from: 0,
                to: 4,
            },
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("rejected:"));
        assert!(execute(&mut shell, add("  "), &mut out).is_err());
        assert_eq!(titles(&shell), ["A"]);
    }

    #[test]
    fn resolve_task_requires_unique_prefix() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        execute(&mut shell, add("A"), &mut Vec::new()).unwrap();
        let id = shell.snapshot().cell(HIGH_HIGH)[0].id;
        let text = id.to_string();

        assert_eq!(resolve_task(shell.snapshot(), &text).unwrap(), id);
        assert_eq!(
            resolve_task(shell.snapshot(), &text[..6].to_uppercase()).unwrap(),
            id
        );
        assert!(resolve_task(shell.snapshot(), "abc").is_err());
        assert!(resolve_task(shell.snapshot(), "zzzzzz").is_err());
    }

    #[test]
    fn export_requires_known_extension_or_format() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        let dir = tempfile::tempdir().unwrap();

        let err = execute(
            &mut shell,
            Command::Export {
                path: dir.path().join("tasks.txt"),
                format: None,
            },
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--format"));

        let mut out = Vec::new();
        execute(
            &mut shell,
            Command::Export {
                path: dir.path().join("tasks.txt"),
                format: Some(FileFormat::Csv),
            },
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Exported 0 task(s)"));
    }

    #[test]
    fn import_reads_back_export_with_explicit_format() {
        let conn = open_db_in_memory().unwrap();
        let mut shell = open_shell(&conn);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.dat");
        execute(&mut shell, add("A"), &mut Vec::new()).unwrap();
        execute(
            &mut shell,
            Command::Export {
                path: path.clone(),
                format: Some(FileFormat::Csv),
            },
            &mut Vec::new(),
        )
        .unwrap();

        let other_conn = open_db_in_memory().unwrap();
        let mut other = open_shell(&other_conn);
        let mut out = Vec::new();
        execute(
            &mut other,
            Command::Import {
                path,
                format: Some(FileFormat::Csv),
                overwrite: false,
            },
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Imported 1 new"));
        assert_eq!(titles(&other), ["A"]);
    }
}
