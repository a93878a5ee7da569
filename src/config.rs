//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.govulnbump.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration file name, looked up in the module directory.
pub const CONFIG_FILE: &str = ".govulnbump.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Go toolchain settings.
    #[serde(default)]
    pub go: GoConfig,

    /// Upgrade policy.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write a JSON run report to this path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

/// Vulnerability scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Scanner executable.
    #[serde(default = "default_scanner_binary")]
    pub binary: String,

    /// Alternate vulnerability database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Package pattern to scan.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Set CGO_ENABLED=0 unless the environment already sets it.
    #[serde(default = "default_true")]
    pub disable_cgo: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            binary: default_scanner_binary(),
            db: None,
            pattern: default_pattern(),
            disable_cgo: true,
        }
    }
}

fn default_scanner_binary() -> String {
    "govulncheck".to_string()
}

fn default_pattern() -> String {
    "./...".to_string()
}

fn default_true() -> bool {
    true
}

/// Go toolchain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoConfig {
    /// Go executable.
    #[serde(default = "default_go_binary")]
    pub binary: String,

    /// Run `go mod vendor` after every tidy.
    #[serde(default = "default_true")]
    pub vendor: bool,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            binary: default_go_binary(),
            vendor: true,
        }
    }
}

fn default_go_binary() -> String {
    "go".to_string()
}

/// Which findings justify an upgrade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Advisory ids to always ignore.
    #[serde(default)]
    pub skip: Vec<String>,

    /// Count findings whose vulnerable code is never called.
    #[serde(default)]
    pub include_unreachable: bool,

    /// Fail after this many cycles without convergence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<usize>,
}

impl PolicyConfig {
    /// The skip list as a set.
    pub fn skip_set(&self) -> BTreeSet<String> {
        self.skip.iter().cloned().collect()
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from a module directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref db) = args.db {
            self.scanner.db = Some(db.clone());
        }

        // Skip lists accumulate rather than replace
        for id in &args.skip {
            if !self.policy.skip.contains(id) {
                self.policy.skip.push(id.clone());
            }
        }

        if args.all {
            self.policy.include_unreachable = true;
        }

        if let Some(max_cycles) = args.max_cycles {
            self.policy.max_cycles = Some(max_cycles);
        }

        if args.no_vendor {
            self.go.vendor = false;
        }

        if let Some(ref report) = args.report {
            self.general.report = Some(report.display().to_string());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
