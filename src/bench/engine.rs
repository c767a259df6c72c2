//! Comparison run orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::scheduler::{Measurer, discover_revisions, run_phase_one, run_phase_two};
use super::{PackageRecord, build_plan, count_with_tests};
use crate::error::Result;
use crate::profile::{ProfileCollector, ProfileSharer};
use crate::report::{BenchmarkReport, ReportBuilder, ReportPublisher};
use crate::toolchain::{RunOptions, Toolchain};
use crate::util::CancelToken;
use crate::util::progress::ProgressTracker;
use crate::vcs::Vcs;
use crate::workspace::{ResourceScope, WorkspaceManager};

/// Inputs of one comparison run.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub base_ref: String,
    pub head_ref: String,
    /// Caller's working tree; the head revision is measured in place.
    pub working_tree: PathBuf,
    pub run: RunOptions,
    /// Phase-one concurrency limit.
    pub workers: usize,
    /// Diffs above this percentage are logged as regressions.
    pub regression_threshold: f64,
    pub show_progress: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            base_ref: "HEAD~1".to_string(),
            head_ref: "HEAD".to_string(),
            working_tree: PathBuf::from("."),
            run: RunOptions::default(),
            workers: 4,
            regression_threshold: 5.0,
            show_progress: false,
        }
    }
}

/// The benchmark comparison engine.
pub struct Engine {
    vcs: Arc<dyn Vcs>,
    toolchain: Arc<dyn Toolchain>,
    collector: ProfileCollector,
}

impl Engine {
    #[must_use]
    pub fn new(vcs: Arc<dyn Vcs>, toolchain: Arc<dyn Toolchain>, sharer: Arc<dyn ProfileSharer>) -> Self {
        Self {
            vcs,
            toolchain,
            collector: ProfileCollector::new(sharer),
        }
    }

    /// Run a full comparison and return the final report.
    ///
    /// Every resource created on the way is released before this returns,
    /// whether the run succeeded, failed or was cancelled.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: missing tools, unresolvable
    /// revisions, any phase-one failure, cancellation, or a teardown failure
    /// after an otherwise successful run.
    pub fn compare(
        &self,
        options: &CompareOptions,
        publisher: &ReportPublisher,
        cancel: &CancelToken,
    ) -> Result<BenchmarkReport> {
        let scope = ResourceScope::new();
        let outcome = self.run(options, publisher, &scope, cancel);
        let teardown = scope.close();

        match (outcome, teardown) {
            (Ok(report), Ok(())) => {
                for regression in report.regressions(options.regression_threshold) {
                    warn!(
                        benchmark = %regression.run,
                        resource = %regression.resource,
                        percent = regression.percent,
                        threshold = options.regression_threshold,
                        "performance regression"
                    );
                }
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(teardown)) => {
                warn!(error = %teardown, "teardown after failed run also failed");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn run(
        &self,
        options: &CompareOptions,
        publisher: &ReportPublisher,
        scope: &ResourceScope,
        cancel: &CancelToken,
    ) -> Result<BenchmarkReport> {
        self.vcs.prerequisites()?;
        self.toolchain.prerequisites()?;

        let workspaces = WorkspaceManager::new(Arc::clone(&self.vcs), scope);
        let mut head = workspaces.head(&options.head_ref, &options.working_tree, cancel)?;
        let mut base = workspaces.checkout_base(&options.base_ref, cancel)?;

        let toolchain = self.toolchain.as_ref();
        discover_revisions(toolchain, &mut base, &mut head, cancel)?;

        let total = count_with_tests(&base.packages) + count_with_tests(&head.packages);
        let progress = ProgressTracker::new(total as u64, "compiling test binaries", options.show_progress);
        let work: Vec<&mut PackageRecord> = base
            .packages
            .iter_mut()
            .chain(head.packages.iter_mut())
            .filter(|p| p.has_tests)
            .collect();
        let phase_one = run_phase_one(work, toolchain, scope, options.workers, &progress, cancel);
        progress.finish_and_clear();
        phase_one?;

        let plan = build_plan(&base.packages, &head.packages);
        info!(
            base = %base.commit,
            head = %head.commit,
            entries = plan.len(),
            "execution plan built"
        );

        let mut builder = ReportBuilder::new(&base.commit, &head.commit, &plan);
        publisher.publish(builder.snapshot());

        let measurer = Measurer::new(toolchain, &self.collector, &options.run);
        let phase_two = run_phase_two(&plan, &measurer, &mut builder, publisher, cancel);
        publisher.publish_finished(builder.snapshot());
        phase_two?;

        Ok(builder.into_report())
    }
}
