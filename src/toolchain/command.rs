//! External command execution with echo.

use crate::error::{describe_status, BumpError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Render a command line the way a POSIX shell would accept it.
pub fn display_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| arg.as_ref()))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));

    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r#"'"'"'"#))
    }
}

/// Echo and run a command with inherited stdio, failing on non-zero exit.
pub async fn run_inherited(program: &str, args: &[String], dir: &Path) -> Result<()> {
    let command_line = display_command(program, args);
    println!("+ {}", command_line);
    debug!("Running in {}", dir.display());

    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .await
        .map_err(|source| BumpError::CommandSpawn {
            command: command_line.clone(),
            source,
        })?;

    if !status.success() {
        return Err(BumpError::CommandFailed {
            command: command_line,
            status: describe_status(&status),
        });
    }

    Ok(())
}
