//! Plain-text board rendering.

use eisenhower_core::{Board, Cell, Task, TaskStatus};
use std::io::{self, Write};

const SHORT_ID_CHARS: usize = 8;

/// Prints the nine cells in grid order: importance rows high to low,
/// urgency columns low to high.
pub fn write_board(board: &Board, out: &mut impl Write) -> io::Result<()> {
    for (cell, tasks) in board.iter() {
        writeln!(out, "[{}] {}", cell_label(cell), tasks.len())?;
        for task in tasks {
            writeln!(out, "  {}", task_line(task))?;
        }
    }
    Ok(())
}

pub fn write_list<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    out: &mut impl Write,
) -> io::Result<()> {
    for task in tasks {
        writeln!(out, "{} | {}", cell_label(task.cell()), task_line(task))?;
    }
    Ok(())
}

pub fn cell_label(cell: Cell) -> String {
    format!("importance {} / urgency {}", cell.importance, cell.urgency)
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{}. {} {} {}",
        task.order_index,
        status_marker(task.status),
        short_id(task),
        task.title
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due {due})"));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    line
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(SHORT_ID_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use eisenhower_core::Level;

    #[test]
    fn board_lists_every_cell_in_grid_order() {
        let mut task = Task::new("Pay rent", Cell::new(Level::High, Level::High));
        task.status = TaskStatus::Completed;
        task.due_date = NaiveDate::from_ymd_opt(2025, 5, 1);
        task.tags.insert("home".to_string());
        let board = Board::from_tasks(vec![task.clone()]);

        let mut out = Vec::new();
        write_board(&board, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "[importance high / urgency low] 0");
        assert_eq!(lines[2], "[importance high / urgency high] 1");
        assert_eq!(
            lines[3],
            format!("  0. [x] {} Pay rent (due 2025-05-01) #home", short_id(&task))
        );
        assert_eq!(lines[9], "[importance low / urgency high] 0");
    }
}
