//! Interactive session: one command per line, same syntax as the CLI.

use crate::cli::Command;
use crate::commands;
use anyhow::Result;
use clap::Parser;
use eisenhower_core::{Shell, TaskRepository};
use log::info;
use std::io::{BufRead, Write};

const PROMPT: &str = "eisenhower> ";

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

/// Runs until end of input or `quit`. Command failures are printed and
/// the session continues.
pub fn run<R: TaskRepository>(
    shell: &mut Shell<R>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    info!("event=repl module=cli status=start");
    write!(out, "{PROMPT}")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if matches!(trimmed, "quit" | "exit") {
            break;
        }
        if !trimmed.is_empty() {
            run_line(shell, trimmed, out)?;
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }

    writeln!(out)?;
    info!("event=repl module=cli status=ok");
    Ok(())
}

fn run_line<R: TaskRepository>(
    shell: &mut Shell<R>,
    line: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some(words) = shlex::split(line) else {
        writeln!(out, "error: unbalanced quotes")?;
        return Ok(());
    };

    let command = match Line::try_parse_from(words) {
        Ok(parsed) => parsed.command,
        Err(err) => {
            write!(out, "{}", err.render())?;
            return Ok(());
        }
    };

    if let Err(err) = commands::execute(shell, command, out) {
        writeln!(out, "error: {err:#}")?;
    }
    Ok(())
}
