//! Markdown rendering of a report, as posted to pull requests and printed
//! on the console.
//!
//! Each side's value renders as `n/a` when that side has no shareable key.
//! The diff needs keys on both sides and a non-zero base. Every number in
//! the table links to its profile.

use std::fmt::Write;

use super::{BenchmarkReport, BenchmarkResult, BenchmarkValue};
use crate::profile::share::DEFAULT_SHARE_URL;
use crate::util::humanize;

const UNAVAILABLE: &str = "n/a";

/// Pure report to markdown renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownRenderer {
    share_url: String,
    /// `(owner, repo)` for the compare link.
    repository: Option<(String, String)>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SHARE_URL)
    }
}

impl MarkdownRenderer {
    #[must_use]
    pub fn new(share_url: impl Into<String>) -> Self {
        Self {
            share_url: share_url.into().trim_end_matches('/').to_string(),
            repository: None,
        }
    }

    /// Add a GitHub compare link after the revision line.
    #[must_use]
    pub fn with_compare_link(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.repository = Some((owner.into(), repo.into()));
        self
    }

    /// Format one side's value, linked to its profile.
    #[must_use]
    pub fn value(&self, value: &BenchmarkValue, unit: &str) -> String {
        if !value.is_available() {
            return UNAVAILABLE.to_string();
        }
        let formatted = match unit {
            "bytes" => humanize::ibytes(u64::try_from(value.value).unwrap_or(0)),
            "ns" => humanize::nanos(value.value),
            _ => humanize::comma(value.value),
        };
        format!("[{formatted}]({}/share/{})", self.share_url, value.key)
    }

    /// Format the base to head change, linked to the profile diff.
    #[must_use]
    pub fn diff(&self, result: &BenchmarkResult) -> String {
        match result.diff_percent() {
            Some(pct) => format!(
                "[{} %]({}/share/{}/{})",
                humanize::comma_float(pct, 2),
                self.share_url,
                result.base.key,
                result.head.key
            ),
            None => UNAVAILABLE.to_string(),
        }
    }

    /// Render the whole report. Same input, same output.
    #[must_use]
    pub fn render(&self, report: &BenchmarkReport, finished: bool) -> String {
        let mut out = String::from("### Benchmark Report\n\n");
        out.push_str(if finished {
            "__Finished__"
        } else {
            "__In progress__"
        });
        out.push_str("\n\n");

        let _ = write!(out, "{} -> {}", report.base_ref, report.head_ref);
        if let Some((owner, repo)) = &self.repository {
            let _ = write!(
                out,
                " ([compare](https://github.com/{owner}/{repo}/compare/{}...{}))",
                report.base_ref, report.head_ref
            );
        }

        for run in &report.runs {
            let _ = write!(
                out,
                "\n<details>\n<summary><tt>{}</tt></summary>\n\n\
                 | Resource | Base | Head | Diff % |\n\
                 |----------|-----:|-----:|-------:|",
                run.name
            );
            for result in &run.results {
                let _ = write!(
                    out,
                    "\n| {} | {} | {} | {} |",
                    result.name,
                    self.value(&result.base, &result.unit),
                    self.value(&result.head, &result.unit),
                    self.diff(result)
                );
            }
            out.push_str("\n</details>");
        }
        out.push('\n');
        out
    }
}
