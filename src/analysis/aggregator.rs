//! Finding aggregation.
//!
//! Folds the findings of one scan into one [`Candidate`] per module. The
//! result is rebuilt from scratch every cycle and is never mutated after
//! construction.

use super::version::sort_loose;
use crate::models::{Finding, STDLIB_MODULE};
use std::collections::{BTreeMap, BTreeSet};

/// Advisories rendered per summary line.
pub const ADVISORIES_PER_LINE: usize = 5;

/// Which findings count toward an upgrade.
#[derive(Debug, Clone, Default)]
pub struct AggregationPolicy {
    /// Count findings whose vulnerable symbol is never called.
    pub include_unreachable: bool,
    /// Advisory ids that never justify an upgrade.
    pub skip: BTreeSet<String>,
}

/// Aggregated upgrade view of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub module: String,
    /// Installed versions seen in this scan, ascending loose order.
    pub installed: Vec<String>,
    /// Fixed versions proposed by non-skipped advisories, ascending loose order.
    pub fixed: Vec<String>,
    /// Non-skipped advisory ids, sorted.
    pub advisories: Vec<String>,
    /// Advisory ids dropped by the skip list, sorted.
    pub skipped: Vec<String>,
}

impl Candidate {
    /// Whether this module should be upgraded.
    pub fn is_actionable(&self) -> bool {
        !self.advisories.is_empty() && !self.fixed.is_empty()
    }

    /// Highest fixed version, the version an upgrade pins to.
    pub fn target(&self) -> Option<&str> {
        self.fixed.last().map(String::as_str)
    }

    /// Human-readable summary, one entry per output line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} ({}) => ({})",
            self.module,
            self.installed.join(", "),
            self.fixed.join(", ")
        )];

        for chunk in self.advisories.chunks(ADVISORIES_PER_LINE) {
            lines.push(format!("  {}", chunk.join(", ")));
        }

        if !self.skipped.is_empty() {
            lines.push(format!("  skipped: {}", self.skipped.join(", ")));
        }

        if !self.advisories.is_empty() && self.fixed.is_empty() {
            lines.push("  No fixed version available.".to_string());
        }

        lines
    }
}

#[derive(Default)]
struct Accumulator {
    installed: BTreeSet<String>,
    fixed: BTreeSet<String>,
    advisories: BTreeSet<String>,
    skipped: BTreeSet<String>,
}

impl Accumulator {
    fn into_candidate(self, module: String) -> Candidate {
        let mut installed: Vec<String> = self.installed.into_iter().collect();
        let mut fixed: Vec<String> = self.fixed.into_iter().collect();
        sort_loose(&mut installed);
        sort_loose(&mut fixed);

        Candidate {
            module,
            installed,
            fixed,
            advisories: self.advisories.into_iter().collect(),
            skipped: self.skipped.into_iter().collect(),
        }
    }
}

/// Group findings into per-module candidates, ordered by module path.
///
/// Findings without a trace, findings against the standard library, and
/// (unless the policy says otherwise) unreachable findings are dropped.
pub fn aggregate(findings: &[Finding], policy: &AggregationPolicy) -> Vec<Candidate> {
    let grouped = findings
        .iter()
        .filter(|finding| policy.include_unreachable || finding.is_reachable())
        .filter_map(|finding| finding.root_frame().map(|frame| (finding, frame)))
        .filter(|(_, frame)| frame.module != STDLIB_MODULE)
        .fold(
            BTreeMap::<String, Accumulator>::new(),
            |mut grouped, (finding, frame)| {
                let acc = grouped.entry(frame.module.clone()).or_default();

                if let Some(version) = frame.version.as_deref().filter(|v| !v.is_empty()) {
                    acc.installed.insert(version.to_string());
                }

                if policy.skip.contains(&finding.osv) {
                    acc.skipped.insert(finding.osv.clone());
                } else {
                    acc.advisories.insert(finding.osv.clone());
                    let fixed = finding.fixed_version.as_deref().filter(|v| !v.is_empty());
                    if let Some(fixed) = fixed {
                        acc.fixed.insert(fixed.to_string());
                    }
                }

                grouped
            },
        );

    grouped
        .into_iter()
        .map(|(module, acc)| acc.into_candidate(module))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frame;

    fn finding(module: &str, installed: &str, fixed: Option<&str>, osv: &str) -> Finding {
        Finding {
            osv: osv.to_string(),
            fixed_version: fixed.map(String::from),
            trace: vec![Frame {
                module: module.to_string(),
                version: Some(installed.to_string()),
                package: Some(module.to_string()),
                function: Some("Parse".to_string()),
                receiver: None,
            }],
        }
    }

    fn unreachable(module: &str, installed: &str, fixed: &str, osv: &str) -> Finding {
        let mut f = finding(module, installed, Some(fixed), osv);
        f.trace[0].function = None;
        f
    }

    #[test]
    fn test_empty_scan() {
        assert!(aggregate(&[], &AggregationPolicy::default()).is_empty());
    }

    #[test]
    fn test_groups_by_module() {
        let findings = vec![
            finding("golang.org/x/net", "v0.10.0", Some("v0.13.0"), "GO-2023-1988"),
            finding("golang.org/x/net", "v0.10.0", Some("v0.17.0"), "GO-2023-2102"),
            finding("golang.org/x/text", "v0.3.7", Some("v0.3.8"), "GO-2022-1059"),
        ];

        let candidates = aggregate(&findings, &AggregationPolicy::default());

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].module, "golang.org/x/net");
        assert_eq!(candidates[0].installed, vec!["v0.10.0"]);
        assert_eq!(candidates[0].fixed, vec!["v0.13.0", "v0.17.0"]);
        assert_eq!(candidates[0].advisories, vec!["GO-2023-1988", "GO-2023-2102"]);
        assert_eq!(candidates[1].module, "golang.org/x/text");
    }

    #[test]
    fn test_stdlib_never_aggregated() {
        let findings = vec![
            finding("stdlib", "go1.20.1", Some("go1.20.5"), "GO-2023-1840"),
            finding("stdlib", "go1.20.1", Some("go1.21.1"), "GO-2023-2041"),
        ];

        let policy = AggregationPolicy {
            include_unreachable: true,
            skip: BTreeSet::new(),
        };
        assert!(aggregate(&findings, &policy).is_empty());
    }

    #[test]
    fn test_target_uses_loose_ordering() {
        let findings = vec![
            finding("example.com/lib", "1.0.0", Some("1.2.0"), "GO-2024-0001"),
            finding("example.com/lib", "1.0.0", Some("1.10.0"), "GO-2024-0002"),
        ];

        let candidates = aggregate(&findings, &AggregationPolicy::default());

        assert_eq!(candidates[0].target(), Some("1.10.0"));
        assert_eq!(candidates[0].fixed, vec!["1.2.0", "1.10.0"]);
    }

    #[test]
    fn test_unreachable_filtered_by_default() {
        let findings = vec![unreachable("example.com/lib", "v1.0.0", "v1.0.1", "GO-2024-0003")];

        assert!(aggregate(&findings, &AggregationPolicy::default()).is_empty());

        let policy = AggregationPolicy {
            include_unreachable: true,
            ..AggregationPolicy::default()
        };
        let candidates = aggregate(&findings, &policy);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_actionable());
    }

    #[test]
    fn test_missing_trace_is_ignored() {
        let findings = vec![Finding {
            osv: "GO-2024-0004".to_string(),
            fixed_version: Some("v1.0.1".to_string()),
            trace: vec![],
        }];

        let policy = AggregationPolicy {
            include_unreachable: true,
            ..AggregationPolicy::default()
        };
        assert!(aggregate(&findings, &policy).is_empty());
    }

    #[test]
    fn test_skip_list_makes_candidate_inactive() {
        let findings = vec![
            finding("example.com/lib", "v1.0.0", Some("v1.1.0"), "GO-2024-0005"),
            finding("example.com/lib", "v1.0.0", Some("v1.2.0"), "GO-2024-0006"),
        ];
        let policy = AggregationPolicy {
            include_unreachable: false,
            skip: ["GO-2024-0005", "GO-2024-0006"]
                .into_iter()
                .map(String::from)
                .collect(),
        };

        let candidates = aggregate(&findings, &policy);

        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_actionable());
        assert!(candidates[0].fixed.is_empty());
        assert_eq!(candidates[0].skipped, vec!["GO-2024-0005", "GO-2024-0006"]);
        assert_eq!(candidates[0].installed, vec!["v1.0.0"]);
    }

    #[test]
    fn test_partial_skip_excludes_skipped_fix() {
        let findings = vec![
            finding("example.com/lib", "v1.0.0", Some("v1.1.0"), "GO-2024-0007"),
            finding("example.com/lib", "v1.0.0", Some("v2.0.0"), "GO-2024-0008"),
        ];
        let policy = AggregationPolicy {
            include_unreachable: false,
            skip: ["GO-2024-0008".to_string()].into_iter().collect(),
        };

        let candidates = aggregate(&findings, &policy);

        assert_eq!(candidates[0].target(), Some("v1.1.0"));
        assert_eq!(candidates[0].advisories, vec!["GO-2024-0007"]);
    }

    #[test]
    fn test_no_fixed_version_not_actionable() {
        let findings = vec![finding("example.com/abandoned", "v0.1.0", None, "GO-2024-0009")];

        let candidates = aggregate(&findings, &AggregationPolicy::default());

        assert!(!candidates[0].is_actionable());
        assert!(candidates[0]
            .summary_lines()
            .contains(&"  No fixed version available.".to_string()));
    }

    #[test]
    fn test_summary_wraps_advisories() {
        let findings: Vec<Finding> = (1..=7)
            .map(|i| {
                finding(
                    "example.com/lib",
                    "v1.0.0",
                    Some("v1.0.1"),
                    &format!("GO-2024-000{}", i),
                )
            })
            .collect();

        let lines = aggregate(&findings, &AggregationPolicy::default())[0].summary_lines();

        assert_eq!(lines[0], "example.com/lib (v1.0.0) => (v1.0.1)");
        assert_eq!(
            lines[1],
            "  GO-2024-0001, GO-2024-0002, GO-2024-0003, GO-2024-0004, GO-2024-0005"
        );
        assert_eq!(lines[2], "  GO-2024-0006, GO-2024-0007");
        assert_eq!(lines.len(), 3);
    }
}
