//! Command-line surface.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eisenhower_core::model::task::parse_due_date;
use eisenhower_core::{FileFormat, Level, TaskStatus};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "eisenhower")]
#[command(about = "Eisenhower 3x3 task matrix", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite task store.
    #[arg(long, global = true, env = "EISENHOWER_DB_PATH", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// trace | debug | info | warn | error
    #[arg(long, global = true, env = "EISENHOWER_LOG_LEVEL", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for rolling log files.
    #[arg(long, global = true, env = "EISENHOWER_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Echo warnings and errors from the log to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Add a task at the end of its cell.
    Add {
        title: String,
        #[arg(short, long, default_value_t = Level::Medium)]
        importance: Level,
        #[arg(short, long, default_value_t = Level::Medium)]
        urgency: Level,
        #[arg(short, long)]
        description: Option<String>,
        /// todo | in_progress | completed
        #[arg(short, long, default_value_t = TaskStatus::Todo)]
        status: TaskStatus,
        /// Due date as YYYY-MM-DD.
        #[arg(long, value_parser = parse_due)]
        due: Option<NaiveDate>,
        /// Tag label. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Edit task fields. A new cell appends the task to that cell.
    Edit {
        /// Task id or unique id prefix.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(short, long)]
        importance: Option<Level>,
        #[arg(short, long)]
        urgency: Option<Level>,
        #[arg(short, long)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        /// Replaces all tags. May be repeated.
        #[arg(long = "tag", conflicts_with = "clear_tags")]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
    },

    /// Change task status.
    Status {
        id: String,
        status: TaskStatus,
    },

    /// Move a task to a cell position. Appends when no index is given.
    Move {
        id: String,
        importance: Level,
        urgency: Level,
        #[arg(long)]
        index: Option<usize>,
    },

    /// Reorder tasks inside one cell.
    Reorder {
        importance: Level,
        urgency: Level,
        from: usize,
        to: usize,
    },

    /// Delete a task.
    Delete { id: String },

    /// Print the 3x3 board.
    Board,

    /// List tasks in board order.
    List {
        #[arg(short, long)]
        importance: Option<Level>,
        #[arg(short, long)]
        urgency: Option<Level>,
        #[arg(short, long)]
        status: Option<TaskStatus>,
    },

    /// Filter the board by title. An empty text clears the filter.
    Search { text: String },

    /// Export every task to CSV or XLSX.
    Export {
        path: PathBuf,
        /// Defaults to the file extension.
        #[arg(long, value_parser = parse_format)]
        format: Option<FileFormat>,
    },

    /// Import tasks from CSV or XLSX.
    Import {
        path: PathBuf,
        /// Defaults to the file extension.
        #[arg(long, value_parser = parse_format)]
        format: Option<FileFormat>,
        /// Replace stored tasks with the same id instead of skipping them.
        #[arg(long)]
        overwrite: bool,
    },

    /// Interactive session reading one command per line.
    Shell,
}

fn parse_due(value: &str) -> Result<NaiveDate, String> {
    parse_due_date(value).map_err(|err| err.to_string())
}

fn parse_format(value: &str) -> Result<FileFormat, String> {
    value.parse().map_err(|err: eisenhower_core::TransferError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use eisenhower_core::{FileFormat, Level, TaskStatus};

    #[test]
    fn add_defaults_to_medium_cell() {
        let cli = Cli::try_parse_from(["eisenhower", "add", "water plants"]).unwrap();
        match cli.command {
            Command::Add {
                title,
                importance,
                urgency,
                status,
                tags,
                ..
            } => {
                assert_eq!(title, "water plants");
                assert_eq!(importance, Level::Medium);
                assert_eq!(urgency, Level::Medium);
                assert_eq!(status, TaskStatus::Todo);
                assert!(tags.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "eisenhower",
            "board",
            "--db",
            "/tmp/tasks.sqlite3",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Board);
        assert_eq!(cli.db.unwrap().to_str(), Some("/tmp/tasks.sqlite3"));
        assert_eq!(cli.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["eisenhower", "add", "x", "-i", "urgent"]).is_err());
        assert!(Cli::try_parse_from(["eisenhower", "add", "x", "--due", "tomorrow"]).is_err());
        assert!(
            Cli::try_parse_from(["eisenhower", "edit", "abc", "--due", "2025-01-01", "--clear-due"])
                .is_err()
        );
    }

    #[test]
    fn export_format_is_parsed() {
        let cli =
            Cli::try_parse_from(["eisenhower", "export", "out.bin", "--format", "XLSX"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Export {
                format: Some(FileFormat::Xlsx),
                ..
            }
        ));
    }

    #[test]
    fn import_format_and_overwrite_are_parsed() {
        let cli = Cli::try_parse_from([
            "eisenhower",
            "import",
            "backup.dat",
            "--format",
            "csv",
            "--overwrite",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Import {
                format: Some(FileFormat::Csv),
                overwrite: true,
                ..
            }
        ));
    }
}
