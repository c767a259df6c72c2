//! Merging measurements into the report.

use super::{BenchmarkReport, BenchmarkResult, BenchmarkRun, BenchmarkValue};
use crate::bench::ComparisonEntry;
use crate::profile::{BenchmarkMeasurement, ResourceKind};
use crate::workspace::RevisionSide;

fn value_of(measurement: Option<&BenchmarkMeasurement>, kind: ResourceKind) -> BenchmarkValue {
    measurement
        .and_then(|m| m.get(kind))
        .map(|p| BenchmarkValue::new(p.total, p.key.clone()))
        .unwrap_or_default()
}

/// One result per resource kind, sorted by resource name.
///
/// Kinds a side never measured get an empty value.
#[must_use]
pub fn merge_results(
    base: Option<&BenchmarkMeasurement>,
    head: Option<&BenchmarkMeasurement>,
) -> Vec<BenchmarkResult> {
    let mut results: Vec<BenchmarkResult> = ResourceKind::ALL
        .iter()
        .map(|kind| BenchmarkResult {
            name: kind.name().to_string(),
            unit: kind.unit().to_string(),
            base: value_of(base, *kind),
            head: value_of(head, *kind),
        })
        .collect();
    results.sort_by(|a, b| a.name.cmp(&b.name));
    results
}

#[derive(Debug, Default)]
struct EntryMeasurements {
    base: Option<BenchmarkMeasurement>,
    head: Option<BenchmarkMeasurement>,
}

/// Accumulates measurements in plan order.
///
/// Every plan entry has a run from the start; its results stay empty until
/// the first side has been attempted.
#[derive(Debug)]
pub struct ReportBuilder {
    report: BenchmarkReport,
    entries: Vec<EntryMeasurements>,
}

impl ReportBuilder {
    #[must_use]
    pub fn new(base_ref: &str, head_ref: &str, plan: &[ComparisonEntry<'_>]) -> Self {
        let mut report = BenchmarkReport::new(base_ref, head_ref);
        report.runs = plan
            .iter()
            .map(|entry| BenchmarkRun {
                name: entry.key.to_string(),
                results: Vec::new(),
            })
            .collect();
        Self {
            report,
            entries: plan.iter().map(|_| EntryMeasurements::default()).collect(),
        }
    }

    /// Record the outcome of one side of entry `idx`; `None` marks a failed
    /// measurement.
    pub fn record(&mut self, idx: usize, side: RevisionSide, measurement: Option<BenchmarkMeasurement>) {
        let (Some(entry), Some(run)) = (self.entries.get_mut(idx), self.report.runs.get_mut(idx)) else {
            return;
        };
        match side {
            RevisionSide::Base => entry.base = measurement,
            RevisionSide::Head => entry.head = measurement,
        }
        run.results = merge_results(entry.base.as_ref(), entry.head.as_ref());
    }

    /// Raw output captured for one side of entry `idx`.
    #[must_use]
    pub fn raw_output(&self, idx: usize, side: RevisionSide) -> Option<&str> {
        let entry = self.entries.get(idx)?;
        let measurement = match side {
            RevisionSide::Base => entry.base.as_ref(),
            RevisionSide::Head => entry.head.as_ref(),
        };
        measurement.map(|m| m.raw_output.as_str())
    }

    #[must_use]
    pub const fn report(&self) -> &BenchmarkReport {
        &self.report
    }

    /// Owned copy of the current state for publication.
    #[must_use]
    pub fn snapshot(&self) -> BenchmarkReport {
        self.report.clone()
    }

    #[must_use]
    pub fn into_report(self) -> BenchmarkReport {
        self.report
    }
}
