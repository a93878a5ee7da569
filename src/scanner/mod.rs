//! Vulnerability scanner invocation.
//!
//! Runs `govulncheck -json` over the module tree, echoes its config and
//! progress records as they stream in, and hands back the findings once the
//! process has exited cleanly.

pub mod framing;

use crate::error::{describe_status, BumpError, Result};
use crate::models::{Finding, Message};
use crate::toolchain::display_command;
use async_trait::async_trait;
use framing::JsonFramer;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable controlling cgo in the Go toolchain.
const CGO_ENV: &str = "CGO_ENABLED";

/// Source of findings for one convergence cycle.
#[async_trait]
pub trait VulnScanner: Send {
    /// Run one full scan and return every finding it reported.
    async fn scan(&mut self) -> Result<Vec<Finding>>;
}

/// How to invoke the scanner.
#[derive(Debug, Clone)]
pub struct ScannerSettings {
    /// Scanner executable.
    pub binary: String,
    /// Alternate vulnerability database.
    pub db: Option<String>,
    /// Package pattern to scan.
    pub pattern: String,
    /// Build without cgo unless the environment already decides.
    pub disable_cgo: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            binary: "govulncheck".to_string(),
            db: None,
            pattern: "./...".to_string(),
            disable_cgo: true,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScannerSettings {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            db: config.db.clone(),
            pattern: config.pattern.clone(),
            disable_cgo: config.disable_cgo,
        }
    }
}

impl ScannerSettings {
    /// Arguments passed to the scanner binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-json".to_string()];
        if let Some(ref db) = self.db {
            args.push("-db".to_string());
            args.push(db.clone());
        }
        args.push(self.pattern.clone());
        args
    }

    /// The cgo override to apply, given the caller's current setting.
    pub fn cgo_override(
        &self,
        inherited: Option<OsString>,
    ) -> Option<(&'static str, &'static str)> {
        if self.disable_cgo && inherited.is_none() {
            Some((CGO_ENV, "0"))
        } else {
            None
        }
    }
}

/// `govulncheck` run as a child process in the module directory.
pub struct Govulncheck {
    settings: ScannerSettings,
    dir: PathBuf,
}

impl Govulncheck {
    pub fn new(settings: ScannerSettings, dir: PathBuf) -> Self {
        Self { settings, dir }
    }
}

#[async_trait]
impl VulnScanner for Govulncheck {
    async fn scan(&mut self) -> Result<Vec<Finding>> {
        let args = self.settings.args();
        let command_line = display_command(&self.settings.binary, &args);
        println!("+ {}", command_line);

        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(&args)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some((key, value)) = self.settings.cgo_override(std::env::var_os(CGO_ENV)) {
            debug!("Setting {}={} for the scanner", key, value);
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| BumpError::ScannerSpawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BumpError::Protocol("scanner stdout was not captured".to_string()))?;

        let findings = read_stream(BufReader::new(stdout)).await?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(BumpError::ScannerExit {
                command: command_line,
                status: describe_status(&status),
            });
        }

        info!("Scanner reported {} findings", findings.len());
        Ok(findings)
    }
}

/// Consume a scanner stream to its end, echoing config and progress records.
pub async fn read_stream<R>(reader: R) -> Result<Vec<Finding>>
where
    R: AsyncBufRead + Unpin,
{
    let mut framer = JsonFramer::new();
    let mut findings = Vec::new();
    let mut lines = reader.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BumpError::Protocol(format!("unreadable scanner output: {}", e)))?
    {
        for record in framer.push_line(&line)? {
            let message: Message = serde_json::from_str(&record)
                .map_err(|e| BumpError::Protocol(format!("{}: {}", e, record)))?;
            if let Some(finding) = handle_message(message) {
                findings.push(finding);
            }
        }
    }

    framer.finish()?;
    Ok(findings)
}

fn handle_message(message: Message) -> Option<Finding> {
    if let Some(config) = message.config {
        println!("{}", config);
    }
    if let Some(progress) = message.progress {
        println!("{}", progress.message);
    }
    message.finding
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = include_str!("../../fixtures/govulncheck_stream.json");

    #[tokio::test]
    async fn test_read_stream_collects_findings() {
        let findings = read_stream(BufReader::new(STREAM.as_bytes())).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].osv, "GO-2023-2102");
        assert_eq!(findings[0].trace.len(), 2);
        assert!(findings[0].is_reachable());
    }

    #[tokio::test]
    async fn test_read_stream_truncated() {
        let truncated = &STREAM[..STREAM.len() - 4];
        let result = read_stream(BufReader::new(truncated.as_bytes())).await;
        assert!(matches!(result, Err(BumpError::Truncated { .. })));
    }

    #[tokio::test]
    async fn test_read_stream_rejects_bad_record() {
        let result = read_stream(BufReader::new(&b"{\"finding\": 42}\n"[..])).await;
        assert!(matches!(result, Err(BumpError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_read_stream_empty() {
        let findings = read_stream(BufReader::new(&b""[..])).await.unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_read_stream_compact_records() {
        let stream = "{\"progress\":{\"message\":\"Scanning your code...\"}}\n\n{\"finding\":{\"osv\":\"GO-2024-0001\",\"trace\":[{\"module\":\"example.com/lib\"}]}}\n";
        let findings =
            tokio_test::block_on(read_stream(BufReader::new(stream.as_bytes()))).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].fixed_version.is_none());
        assert!(!findings[0].is_reachable());
    }

    #[tokio::test]
    async fn test_read_stream_invalid_utf8_is_protocol_error() {
        let result = read_stream(BufReader::new(&b"{\"progress\": \"\xff\xfe\"}\n"[..])).await;
        assert!(matches!(result, Err(BumpError::Protocol(_))));
    }

    /// Stand-in scanner: echoes its cgo setting and arguments back as a finding.
    #[cfg(unix)]
    fn fake_scanner(dir: &std::path::Path, exit_code: i32) -> ScannerSettings {
        use std::os::unix::fs::PermissionsExt;

        let script = r#"#!/bin/sh
cat <<EOF
{"progress":{"message":"Scanning your code..."}}
{
  "finding": {
    "osv": "CGO-${CGO_ENABLED:-unset}",
    "fixed_version": "$*",
    "trace": [{"module": "example.com/lib", "version": "v1.0.0", "function": "Do"}]
  }
}
EOF
exit EXIT_CODE
"#
        .replace("EXIT_CODE", &exit_code.to_string());

        let path = dir.join("govulncheck");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        ScannerSettings {
            binary: path.display().to_string(),
            ..ScannerSettings::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_runs_process_in_module_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_scanner(dir.path(), 0);
        let mut scanner = Govulncheck::new(settings, dir.path().to_path_buf());

        let findings = scanner.scan().await.unwrap();

        let expected_cgo = std::env::var("CGO_ENABLED").unwrap_or_else(|_| "0".to_string());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].osv, format!("CGO-{}", expected_cgo));
        assert_eq!(findings[0].fixed_version.as_deref(), Some("-json ./..."));
        assert!(findings[0].is_reachable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_nonzero_exit_discards_findings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fake_scanner(dir.path(), 3);
        let mut scanner = Govulncheck::new(settings, dir.path().to_path_buf());

        let result = scanner.scan().await;

        match result {
            Err(BumpError::ScannerExit { status, .. }) => assert_eq!(status, "exit code 3"),
            other => panic!("expected scanner exit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ScannerSettings {
            binary: dir.path().join("no-such-scanner").display().to_string(),
            ..ScannerSettings::default()
        };
        let mut scanner = Govulncheck::new(settings, dir.path().to_path_buf());

        let result = scanner.scan().await;
        assert!(matches!(result, Err(BumpError::ScannerSpawn { .. })));
    }

    #[test]
    fn test_args() {
        let mut settings = ScannerSettings::default();
        assert_eq!(settings.args(), vec!["-json", "./..."]);

        settings.db = Some("file:///srv/vulndb".to_string());
        assert_eq!(
            settings.args(),
            vec!["-json", "-db", "file:///srv/vulndb", "./..."]
        );
    }

    #[test]
    fn test_cgo_override_respects_environment() {
        let settings = ScannerSettings::default();
        assert_eq!(settings.cgo_override(None), Some(("CGO_ENABLED", "0")));
        assert_eq!(settings.cgo_override(Some(OsString::from("1"))), None);

        let settings = ScannerSettings {
            disable_cgo: false,
            ..ScannerSettings::default()
        };
        assert_eq!(settings.cgo_override(None), None);
    }
}
