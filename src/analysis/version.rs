//! Lenient version ordering.
//!
//! Go module versions are mostly semver with a `v` prefix, but pseudo-versions
//! and odd tags show up often enough that strict parsing is the wrong tool.
//! A [`LooseVersion`] never fails to parse: digit runs compare numerically,
//! letter runs compare lexically, and punctuation only separates components.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    Number(u64),
    Word(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Number(a), Component::Number(b)) => a.cmp(b),
            (Component::Word(a), Component::Word(b)) => a.cmp(b),
            (Component::Number(_), Component::Word(_)) => Ordering::Less,
            (Component::Word(_), Component::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version string with a total, lenient ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseVersion {
    raw: String,
    components: Vec<Component>,
}

impl LooseVersion {
    pub fn parse(raw: &str) -> Self {
        let mut components = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut digits = String::new();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                // Absurdly long digit runs saturate instead of failing.
                components.push(Component::Number(digits.parse().unwrap_or(u64::MAX)));
            } else if c.is_alphabetic() {
                let mut word = String::new();
                while let Some(&w) = chars.peek().filter(|w| w.is_alphabetic()) {
                    word.extend(w.to_lowercase());
                    chars.next();
                }
                components.push(Component::Word(word));
            } else {
                chars.next();
            }
        }

        Self {
            raw: raw.to_string(),
            components,
        }
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .cmp(&other.components)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Sort version strings in ascending loose order.
pub fn sort_loose(versions: &mut [String]) {
    versions.sort_by_cached_key(|v| LooseVersion::parse(v));
}
