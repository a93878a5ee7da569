//! The convergence loop.
//!
//! Each cycle scans, aggregates, and upgrades at most one module, then
//! re-normalizes the manifest. Upgrading several direct dependencies in one
//! pass can pull transitive requirements in conflicting directions, so the
//! remaining candidates wait for the next scan. The loop ends on the first
//! cycle that finds nothing actionable; if the scanner keeps reporting an
//! unfixable finding it does not end at all, unless `max_cycles` is set.

use crate::analysis::{aggregate, AggregationPolicy, Candidate};
use crate::error::{BumpError, Result};
use crate::manifest::{self, Manifest};
use crate::models::{Finalization, RunSummary, Upgrade};
use crate::scanner::VulnScanner;
use crate::toolchain::PackageManager;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Knobs for a convergence run.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub aggregation: AggregationPolicy,
    /// Give up after this many cycles without convergence.
    pub max_cycles: Option<usize>,
}

/// Result of one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing actionable was found; the manifest was not touched.
    Converged,
    /// One module was upgraded and the manifest re-normalized.
    Upgraded(Upgrade),
}

/// Drives scan/upgrade cycles against one module.
pub struct Bumper<S, P> {
    scanner: S,
    packages: P,
    manifest: Manifest,
    policy: Policy,
    cycles: usize,
}

impl<S: VulnScanner, P: PackageManager> Bumper<S, P> {
    pub fn new(scanner: S, packages: P, manifest: Manifest, policy: Policy) -> Self {
        Self {
            scanner,
            packages,
            manifest,
            policy,
            cycles: 0,
        }
    }

    /// Normalize, cycle until converged, then finalize the manifest.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.packages.normalize().await?;
        let go_before = self.manifest.go_version()?;
        debug!("Declared go version before bumping: {:?}", go_before);

        let mut upgrades = Vec::new();
        loop {
            match self.run_once().await? {
                CycleOutcome::Converged => break,
                CycleOutcome::Upgraded(upgrade) => {
                    upgrades.push(upgrade);
                    if let Some(limit) = self.policy.max_cycles {
                        if self.cycles >= limit {
                            return Err(BumpError::CycleLimit {
                                cycles: self.cycles,
                            });
                        }
                    }
                }
            }
        }

        let finalization = self.finalize(go_before).await?;

        Ok(RunSummary {
            started_at,
            cycles: self.cycles,
            upgrades,
            finalization,
            duration_seconds: start.elapsed().as_secs_f64(),
        })
    }

    /// Run a single scan cycle.
    pub async fn run_once(&mut self) -> Result<CycleOutcome> {
        self.cycles += 1;
        info!("Starting cycle {}", self.cycles);

        let findings = self.scanner.scan().await?;
        let candidates = aggregate(&findings, &self.policy.aggregation);
        debug!(
            "{} findings grouped into {} candidates",
            findings.len(),
            candidates.len()
        );

        let mut applied: Option<Upgrade> = None;

        for candidate in &candidates {
            for line in candidate.summary_lines() {
                println!("{}", line);
            }

            let Some(target) = candidate.target().filter(|_| candidate.is_actionable()) else {
                if candidate.advisories.is_empty() {
                    println!("  All advisories skipped, not bumping.");
                }
                continue;
            };

            if applied.is_some() {
                println!("  Not bumping now to avoid unexpected downgrading.");
                continue;
            }

            self.packages.get(&candidate.module, target).await?;
            applied = Some(self.record(candidate, target));
        }

        match applied {
            None => {
                info!("Nothing actionable after {} cycles", self.cycles);
                Ok(CycleOutcome::Converged)
            }
            Some(upgrade) => {
                self.packages.normalize().await?;
                Ok(CycleOutcome::Upgraded(upgrade))
            }
        }
    }

    fn record(&self, candidate: &Candidate, target: &str) -> Upgrade {
        info!("Bumped {} to {}", candidate.module, target);
        Upgrade {
            cycle: self.cycles,
            module: candidate.module.clone(),
            from: candidate.installed.clone(),
            to: target.to_string(),
            advisories: candidate.advisories.clone(),
        }
    }

    /// Pin prior runtime behavior if the go version moved, then drop
    /// toolchain lines and write the manifest back.
    async fn finalize(&mut self, go_before: Option<String>) -> Result<Finalization> {
        let mut text = self.manifest.read()?;
        let go_after = manifest::go_version(&text);
        let mut godebug_default = None;

        match (go_before.as_deref(), go_after.as_deref()) {
            (Some(before), Some(after)) if before != after => {
                info!("go version changed from {} to {}", before, after);
                if let Some(pinned) = manifest::insert_godebug(&text, before) {
                    self.manifest.write(&pinned)?;
                    self.packages.tidy().await?;
                    text = self.manifest.read()?;
                    godebug_default = Some(before.to_string());
                }
            }
            (Some(_), None) => warn!(
                "go directive disappeared from {}",
                self.manifest.path().display()
            ),
            _ => {}
        }

        let (stripped, removed) = manifest::strip_toolchain(&text);
        if removed > 0 {
            debug!("Removed {} toolchain lines", removed);
        }
        self.manifest.write(&stripped)?;

        Ok(Finalization {
            go_version_before: go_before,
            go_version_after: go_after,
            godebug_default,
            toolchain_lines_removed: removed,
        })
    }
}
