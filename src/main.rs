//! govulnbump - iterative govulncheck remediation
//!
//! Repeatedly scans a Go module with govulncheck, upgrades one vulnerable
//! dependency per scan, and re-normalizes go.mod until the scanner reports
//! nothing actionable.
//!
//! Exit codes:
//!   0 - Converged
//!   1 - Any failure (invalid arguments, scanner or go command failure, etc.)

mod analysis;
mod bump;
mod cli;
mod config;
mod error;
mod manifest;
mod models;
mod report;
mod scanner;
mod toolchain;

use analysis::AggregationPolicy;
use anyhow::{Context, Result};
use bump::{Bumper, Policy};
use cli::Args;
use config::{Config, CONFIG_FILE};
use manifest::Manifest;
use scanner::{Govulncheck, ScannerSettings};
use std::path::Path;
use toolchain::GoCommand;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(&args.dir);
    }

    // Initialize logging
    init_logging(&args);

    info!("govulnbump v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_bump(args).await {
        error!("Bump failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .govulnbump.toml.
fn handle_init_config(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `--verbose`/`--quiet`.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete bump workflow.
async fn run_bump(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!("Effective config: {:?}", config);

    let dir = args.dir.clone();
    let scanner = Govulncheck::new(ScannerSettings::from(&config.scanner), dir.clone());
    let packages = GoCommand::new(config.go.binary.clone(), dir.clone(), config.go.vendor);
    let policy = Policy {
        aggregation: AggregationPolicy {
            include_unreachable: config.policy.include_unreachable,
            skip: config.policy.skip_set(),
        },
        max_cycles: config.policy.max_cycles,
    };

    if policy.aggregation.include_unreachable {
        info!("Including findings in code that is never called");
    }
    if !policy.aggregation.skip.is_empty() {
        info!("Skipping {} advisories", policy.aggregation.skip.len());
    }

    let mut bumper = Bumper::new(scanner, packages, Manifest::in_dir(&dir), policy);
    let summary = bumper.run().await?;

    println!("\n{}", report::generate_text_summary(&summary));

    if let Some(ref path) = config.general.report {
        report::write_json_report(&summary, Path::new(path))?;
        println!("Report saved to: {}", path);
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try the module directory; a file that fails to parse is fatal
    match Config::load_from_dir(&args.dir)? {
        Some(config) => {
            info!("Loaded config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
