//! Error types for the bump workflow.
//!
//! Every variant is fatal: nothing is retried, and errors unwind to `main`
//! where the run terminates with a non-zero exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning, upgrading, or rewriting the manifest.
#[derive(Debug, Error)]
pub enum BumpError {
    /// The scanner binary could not be started.
    #[error("failed to spawn scanner `{command}`: {source}")]
    ScannerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The scanner ran but exited unsuccessfully.
    #[error("scanner `{command}` exited with {status}")]
    ScannerExit { command: String, status: String },

    /// The scanner produced output that is not a valid record stream.
    #[error("malformed scanner output: {0}")]
    Protocol(String),

    /// The scanner stream ended in the middle of a record.
    #[error("scanner output ended with an unterminated record ({pending} bytes buffered)")]
    Truncated { pending: usize },

    /// A package manager command could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A package manager command exited unsuccessfully.
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    /// Reading or writing the manifest failed.
    #[error("manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The optional cycle cap was reached before convergence.
    #[error("no convergence after {cycles} cycles")]
    CycleLimit { cycles: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BumpError>;

/// Render a process exit status the way it is shown to the user.
pub(crate) fn describe_status(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}
