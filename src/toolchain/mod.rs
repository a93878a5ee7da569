//! Package manager operations.
//!
//! The convergence loop only needs three things from the Go toolchain:
//! normalize the manifest, refresh the vendor tree, and pin one module.

mod command;

pub use command::{display_command, run_inherited};

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Package manager operations used by the convergence loop.
#[async_trait]
pub trait PackageManager: Send {
    /// Normalize direct and indirect requirements.
    async fn tidy(&mut self) -> Result<()>;

    /// Materialize the local dependency mirror.
    async fn vendor(&mut self) -> Result<()>;

    /// Fetch `module` pinned to exactly `version`.
    async fn get(&mut self, module: &str, version: &str) -> Result<()>;

    /// Tidy, then vendor.
    async fn normalize(&mut self) -> Result<()> {
        self.tidy().await?;
        self.vendor().await
    }
}

/// The `go` command run in a module directory.
#[derive(Debug, Clone)]
pub struct GoCommand {
    binary: String,
    dir: PathBuf,
    vendor: bool,
}

impl GoCommand {
    pub fn new(binary: impl Into<String>, dir: PathBuf, vendor: bool) -> Self {
        Self {
            binary: binary.into(),
            dir,
            vendor,
        }
    }

    async fn go(&self, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        run_inherited(&self.binary, &args, &self.dir).await
    }
}

#[async_trait]
impl PackageManager for GoCommand {
    async fn tidy(&mut self) -> Result<()> {
        self.go(&["mod", "tidy"]).await
    }

    async fn vendor(&mut self) -> Result<()> {
        if !self.vendor {
            debug!("Vendoring disabled, skipping go mod vendor");
            return Ok(());
        }
        self.go(&["mod", "vendor"]).await
    }

    async fn get(&mut self, module: &str, version: &str) -> Result<()> {
        let target = format!("{}@{}", module, version);
        self.go(&["get", target.as_str()]).await
    }
}
