//! Run summary rendering.
//!
//! Renders a [`RunSummary`] as console text, or as pretty JSON for
//! `--report`.

use crate::models::RunSummary;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate the console summary printed after convergence.
pub fn generate_text_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Converged after {} {} ({:.1}s).",
        summary.cycles,
        if summary.cycles == 1 { "cycle" } else { "cycles" },
        summary.duration_seconds
    ));

    if summary.upgrades.is_empty() {
        lines.push("No modules were bumped.".to_string());
    } else {
        lines.push(format!("Bumped {} modules:", summary.upgrades.len()));
        for upgrade in &summary.upgrades {
            lines.push(format!(
                "  {} {} => {} ({})",
                upgrade.module,
                upgrade.from.join(", "),
                upgrade.to,
                upgrade.advisories.join(", ")
            ));
        }
    }

    let fin = &summary.finalization;
    if let (Some(before), Some(after)) = (&fin.go_version_before, &fin.go_version_after) {
        if before != after {
            lines.push(format!("go directive moved from {} to {}.", before, after));
        }
    }
    if let Some(ref pinned) = fin.godebug_default {
        lines.push(format!("Added godebug default=go{}.", pinned));
    }
    if fin.toolchain_lines_removed > 0 {
        lines.push(format!(
            "Removed {} toolchain line(s).",
            fin.toolchain_lines_removed
        ));
    }

    lines.join("\n")
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(summary: &RunSummary, path: &Path) -> Result<()> {
    let content = generate_json_report(summary)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
