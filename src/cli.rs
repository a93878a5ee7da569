//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::manifest::MANIFEST_FILE;
use clap::Parser;
use std::path::PathBuf;

/// govulnbump - bump Go dependencies until govulncheck is quiet
///
/// Runs govulncheck, upgrades the first vulnerable module to its highest
/// fixed version, tidies and vendors, and repeats until nothing actionable
/// is left. Only one module is upgraded per scan.
///
/// Examples:
///   govulnbump
///   govulnbump --db file:///srv/vulndb
///   govulnbump --skip GO-2022-0646 --skip GO-2023-1571
///   govulnbump --all -C ./services/api --report bump.json
///   govulnbump --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Alternate vulnerability database source
    #[arg(long, value_name = "SOURCE", env = "GOVULNBUMP_DB")]
    pub db: Option<String>,

    /// Advisory ids to always ignore (repeatable or comma-separated)
    #[arg(long, value_name = "ID", num_args = 1.., value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Include findings whose vulnerable code is never called
    #[arg(long)]
    pub all: bool,

    /// Module root containing go.mod
    #[arg(short = 'C', long, default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Fail after this many cycles without convergence
    ///
    /// By default the loop runs until the scanner reports nothing actionable.
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<usize>,

    /// Do not run `go mod vendor` after tidying
    #[arg(long)]
    pub no_vendor: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .govulnbump.toml in the module directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .govulnbump.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_cycles == Some(0) {
            return Err("Max cycles must be at least 1".to_string());
        }

        // Skip filesystem checks for --init-config
        if self.init_config {
            return Ok(());
        }

        if !self.dir.is_dir() {
            return Err(format!(
                "Module directory does not exist: {}",
                self.dir.display()
            ));
        }

        if !self.dir.join(MANIFEST_FILE).is_file() {
            return Err(format!(
                "No {} found in {}",
                MANIFEST_FILE,
                self.dir.display()
            ));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
