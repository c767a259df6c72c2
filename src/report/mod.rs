//! Benchmark report model and its delivery to reporters.
//!
//! A [`BenchmarkReport`] is a complete snapshot: every publication carries
//! all runs known so far, so reporters never need to keep state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod github;
pub mod publish;
pub mod render;
pub mod reporter;

pub use aggregate::{ReportBuilder, merge_results};
pub use github::GitHubCommentReporter;
pub use publish::ReportPublisher;
pub use render::MarkdownRenderer;
pub use reporter::{ConsoleReporter, JsonLinesReporter, NoopReporter, Reporter};

/// One side's scalar and shareable key. An empty key means unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkValue {
    pub value: i64,
    #[serde(default)]
    pub key: String,
}

impl BenchmarkValue {
    #[must_use]
    pub fn new(value: i64, key: impl Into<String>) -> Self {
        Self {
            value,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.key.is_empty()
    }
}

/// Base and head values for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub unit: String,
    pub base: BenchmarkValue,
    pub head: BenchmarkValue,
}

impl BenchmarkResult {
    /// Relative change from base to head in percent.
    ///
    /// `None` when either side has no shareable key or base is zero.
    #[must_use]
    pub fn diff_percent(&self) -> Option<f64> {
        if !self.base.is_available() || !self.head.is_available() || self.base.value == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let (base, head) = (self.base.value as f64, self.head.value as f64);
        Some((head - base) / base * 100.0)
    }
}

/// All results of one plan entry, named `importPath.BenchmarkName`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub name: String,
    #[serde(default)]
    pub results: Vec<BenchmarkResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub base_ref: String,
    pub head_ref: String,
    #[serde(default)]
    pub runs: Vec<BenchmarkRun>,
}

/// A result whose diff exceeds the configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub run: String,
    pub resource: String,
    pub percent: f64,
}

impl BenchmarkReport {
    #[must_use]
    pub fn new(base_ref: impl Into<String>, head_ref: impl Into<String>) -> Self {
        Self {
            base_ref: base_ref.into(),
            head_ref: head_ref.into(),
            runs: Vec::new(),
        }
    }

    /// Results that got worse by more than `threshold` percent.
    #[must_use]
    pub fn regressions(&self, threshold: f64) -> Vec<Regression> {
        self.runs
            .iter()
            .flat_map(|run| {
                run.results.iter().filter_map(move |result| {
                    result
                        .diff_percent()
                        .filter(|pct| *pct > threshold)
                        .map(|percent| Regression {
                            run: run.name.clone(),
                            resource: result.name.clone(),
                            percent,
                        })
                })
            })
            .collect()
    }
}

/// One line of the JSON-lines export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub finished: bool,
    /// When the snapshot was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    pub report: BenchmarkReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(base: BenchmarkValue, head: BenchmarkValue) -> BenchmarkResult {
        BenchmarkResult {
            name: "cpu".to_string(),
            unit: "ns".to_string(),
            base,
            head,
        }
    }

    #[test]
    fn test_diff_percent() {
        let r = result(
            BenchmarkValue::new(10_000_000, "b"),
            BenchmarkValue::new(20_000_000, "h"),
        );
        assert_eq!(r.diff_percent(), Some(100.0));

        let r = result(
            BenchmarkValue::new(2048 * 1024, "b"),
            BenchmarkValue::new(2047 * 1024, "h"),
        );
        let pct = r.diff_percent().expect("diff");
        assert!((pct + 0.048_828_125).abs() < 1e-9);
    }

    #[test]
    fn test_diff_percent_extreme_values() {
        let r = result(BenchmarkValue::new(-10, "b"), BenchmarkValue::new(i64::MAX, "h"));
        let pct = r.diff_percent().expect("diff");
        assert!(pct.is_finite());
        assert!(pct < 0.0);

        let r = result(BenchmarkValue::new(1, "b"), BenchmarkValue::new(i64::MIN, "h"));
        assert!(r.diff_percent().expect("diff").is_finite());
    }

    #[test]
    fn test_diff_unavailable_without_keys_or_base() {
        let r = result(BenchmarkValue::new(10, ""), BenchmarkValue::new(20, "h"));
        assert_eq!(r.diff_percent(), None);

        let r = result(BenchmarkValue::new(0, "b"), BenchmarkValue::new(20, "h"));
        assert_eq!(r.diff_percent(), None);
    }

    #[test]
    fn test_regressions() {
        let mut report = BenchmarkReport::new("a", "b");
        report.runs.push(BenchmarkRun {
            name: "m.BenchmarkSlow".to_string(),
            results: vec![result(
                BenchmarkValue::new(100, "b"),
                BenchmarkValue::new(110, "h"),
            )],
        });
        report.runs.push(BenchmarkRun {
            name: "m.BenchmarkFast".to_string(),
            results: vec![result(
                BenchmarkValue::new(100, "b"),
                BenchmarkValue::new(50, "h"),
            )],
        });

        let found = report.regressions(5.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].run, "m.BenchmarkSlow");
        assert!(report.regressions(20.0).is_empty());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = ReportSnapshot {
            finished: true,
            generated_at: None,
            report: BenchmarkReport::new("abcd", "ef00"),
        };
        let json = serde_json::to_value(&snapshot).expect("json");
        assert_eq!(json["finished"], true);
        assert_eq!(json["report"]["base_ref"], "abcd");
        assert!(json["report"]["runs"].as_array().expect("runs").is_empty());
        assert!(json.get("generated_at").is_none());
    }
}
