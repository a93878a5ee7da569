//! `go.mod` text surgery.
//!
//! The manifest is treated as opaque text. Only two directives matter here:
//! the `go` version line and `toolchain` lines. Both are located with fixed
//! anchor patterns so edits are reproducible byte for byte.

use crate::error::{BumpError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Manifest file name inside a module directory.
pub const MANIFEST_FILE: &str = "go.mod";

/// `go 1.21`, `go 1.21.3`, `go 1.22rc1`, optionally followed by a comment.
const GO_VERSION_PATTERN: &str =
    r"(?m)^go[ \t]+(\d+\.\d+(?:\.\d+)?(?:rc\d+)?)[ \t]*(?://[^\r\n]*)?\r?$";

/// A run of `toolchain` lines together with the line breaks around them.
const TOOLCHAIN_PATTERN: &str = r"(?:\r?\n)+(?:toolchain[ \t]+\S[^\r\n]*\r?(?:(?:\r?\n)+|$))+";

/// An existing default compatibility pin, standalone or inside a block.
const GODEBUG_DEFAULT_PATTERN: &str = r"(?m)^[ \t]*(?:godebug[ \t]+)?default=";

fn go_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(GO_VERSION_PATTERN).expect("valid go version pattern"))
}

fn toolchain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TOOLCHAIN_PATTERN).expect("valid toolchain pattern"))
}

fn godebug_default_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(GODEBUG_DEFAULT_PATTERN).expect("valid godebug pattern"))
}

/// The line ending the manifest already uses.
fn line_ending(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// The declared minimum language version, if the manifest has one.
pub fn go_version(text: &str) -> Option<String> {
    go_version_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Insert `godebug default=go<previous>` right after the `go` line.
///
/// Returns `None` when there is no version line or a default pin already
/// exists, in which case the text needs no change.
pub fn insert_godebug(text: &str, previous: &str) -> Option<String> {
    if godebug_default_re().is_match(text) {
        debug!("Manifest already pins a godebug default");
        return None;
    }

    let line = go_version_re().find(text)?;
    let end = text[..line.end()].trim_end_matches('\r').len();

    let mut out = String::with_capacity(text.len() + 32);
    out.push_str(&text[..end]);
    out.push_str(line_ending(text));
    out.push_str("godebug default=go");
    out.push_str(previous);
    out.push_str(&text[end..]);
    Some(out)
}

/// Remove every `toolchain` line, leaving a single blank separator behind.
///
/// Returns the rewritten text and the number of lines removed.
pub fn strip_toolchain(text: &str) -> (String, usize) {
    let eol = line_ending(text);
    let mut removed = 0;
    let stripped = toolchain_re().replace_all(text, |caps: &regex::Captures<'_>| {
        let Some(run) = caps.get(0) else {
            return String::new();
        };
        removed += run
            .as_str()
            .lines()
            .filter(|line| line.starts_with("toolchain"))
            .count();
        if run.end() == text.len() {
            eol.to_string()
        } else {
            eol.repeat(2)
        }
    });
    (stripped.into_owned(), removed)
}

/// The manifest file of a module.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The manifest of the module rooted at `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(MANIFEST_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|source| BumpError::Manifest {
            path: self.path.clone(),
            source,
        })
    }

    pub fn write(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text).map_err(|source| BumpError::Manifest {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the manifest and extract its `go` version.
    pub fn go_version(&self) -> Result<Option<String>> {
        Ok(go_version(&self.read()?))
    }
}
