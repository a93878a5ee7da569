//! Data models for the bump workflow.
//!
//! The scanner records mirror what `govulncheck -json` emits. Only the
//! fields the bump workflow needs are modelled; everything else is ignored.
//! [`RunSummary`] describes a finished run for the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module identifier reserved for the Go standard library.
pub const STDLIB_MODULE: &str = "stdlib";

/// One framed record from the scanner stream.
///
/// A record usually carries exactly one of these keys, but nothing breaks
/// if several are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub config: Option<ScannerInfo>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub finding: Option<Finding>,
}

/// Scanner and database identity, echoed once at the start of a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerInfo {
    #[serde(default)]
    pub scanner_name: String,
    #[serde(default)]
    pub scanner_version: String,
    #[serde(default)]
    pub db: String,
    #[serde(default)]
    pub db_last_modified: String,
}

impl fmt::Display for ScannerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Running {} {} using {} @ {}",
            self.scanner_name, self.scanner_version, self.db, self.db_last_modified
        )
    }
}

/// Human-readable status line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub message: String,
}

/// One reported vulnerability instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Finding {
    /// Advisory id (e.g. `GO-2023-1840`).
    #[serde(default)]
    pub osv: String,
    /// Minimum version that remediates this finding, if a fix exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    /// Call-path evidence, vulnerable symbol first.
    #[serde(default)]
    pub trace: Vec<Frame>,
}

/// One entry of a finding's trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
}

impl Finding {
    /// The frame identifying the vulnerable module, if any.
    pub fn root_frame(&self) -> Option<&Frame> {
        self.trace.first().filter(|frame| !frame.module.is_empty())
    }

    /// Whether the vulnerable symbol is actually called by the scanned code.
    pub fn is_reachable(&self) -> bool {
        self.root_frame()
            .and_then(|frame| frame.function.as_deref())
            .is_some_and(|function| !function.is_empty())
    }
}

/// One dependency upgrade applied by a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrade {
    /// Cycle number, starting at 1.
    pub cycle: usize,
    pub module: String,
    /// Versions installed before the upgrade.
    pub from: Vec<String>,
    /// Version the module was pinned to.
    pub to: String,
    /// Advisories the upgrade addresses.
    pub advisories: Vec<String>,
}

/// Manifest changes made after convergence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finalization {
    pub go_version_before: Option<String>,
    pub go_version_after: Option<String>,
    /// Version pinned by an inserted `godebug default=` line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub godebug_default: Option<String>,
    pub toolchain_lines_removed: usize,
}

/// Outcome of a complete convergence run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    /// Scan cycles executed, including the converged one.
    pub cycles: usize,
    pub upgrades: Vec<Upgrade>,
    pub finalization: Finalization,
    pub duration_seconds: f64,
}
