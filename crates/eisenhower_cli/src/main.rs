//! `eisenhower` command-line front end.
//!
//! # Responsibility
//! - Resolve configuration and start file logging.
//! - Open the task store and drive the core shell with one command or an
//!   interactive session.

mod cli;
mod commands;
mod config;
mod render;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use config::{AppConfig, Overrides};
use eisenhower_core::db::open_db;
use eisenhower_core::{
    init_logging, EventHandler, Shell, ShellEvent, SqliteTaskRepository, TaskService,
};
use log::{error, info};
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::resolve(&Overrides {
        config_path: cli.config,
        db_path: cli.db,
        log_dir: cli.log_dir,
        log_level: cli.log_level,
    })?;

    init_logging(&config.log_level, &config.log_dir, cli.verbose)
        .context("failed to initialize logging")?;
    config.ensure_dirs()?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open task store `{}`", config.db_path.display()))?;
    let repo = SqliteTaskRepository::try_new(&conn).context("task store is not usable")?;
    let mut shell = Shell::new(TaskService::new(repo));
    commands::report(shell.handle(ShellEvent::Refresh), &mut io::sink())
        .context("failed to load tasks")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Shell => repl::run(&mut shell, io::stdin().lock(), &mut out),
        command => {
            info!("event=cli_command module=cli status=start");
            commands::execute(&mut shell, command, &mut out)
        }
    }
}
