//! Two-phase execution.
//!
//! Phase one (discover, compile, list) runs on a bounded rayon pool with
//! fail-fast group semantics: the first error cancels every in-flight task
//! and becomes the phase result. Phase two runs one benchmark process at a
//! time so measurements never compete for the machine.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, error, info};

use super::compile::compile_package;
use super::discover::discover_packages;
use super::list::list_benchmarks;
use super::{ComparisonEntry, PackageRecord};
use crate::error::{BenchError, Result};
use crate::profile::{BenchmarkMeasurement, ProfileCollector};
use crate::report::{ReportBuilder, ReportPublisher};
use crate::toolchain::{RunOptions, Toolchain};
use crate::util::CancelToken;
use crate::util::progress::ProgressTracker;
use crate::workspace::{ResourceScope, Revision, RevisionSide};

/// Prefer a real failure over the cancellations it caused.
fn first_error(a: BenchError, b: BenchError) -> BenchError {
    if a.is_cancellation() && !b.is_cancellation() {
        b
    } else {
        a
    }
}

/// Discover the packages of both revisions concurrently.
///
/// # Errors
///
/// Returns the first discovery error; the other side is cancelled.
pub fn discover_revisions(
    toolchain: &dyn Toolchain,
    base: &mut Revision,
    head: &mut Revision,
    cancel: &CancelToken,
) -> Result<()> {
    let group = cancel.child();
    let discover = |root: &Path| {
        discover_packages(toolchain, root, &group).inspect_err(|_| group.cancel())
    };

    let (base_result, head_result) = rayon::join(|| discover(&base.root), || discover(&head.root));
    match (base_result, head_result) {
        (Ok(base_packages), Ok(head_packages)) => {
            base.packages = base_packages;
            head.packages = head_packages;
            Ok(())
        }
        (Err(a), Err(b)) => Err(first_error(a, b)),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}

/// Compile and list every package, at most `workers` at a time.
///
/// # Errors
///
/// Returns the first compile or list error observed. Partial results are
/// left in the records but must not be used.
pub fn run_phase_one(
    packages: Vec<&mut PackageRecord>,
    toolchain: &dyn Toolchain,
    scope: &ResourceScope,
    workers: usize,
    progress: &ProgressTracker,
    cancel: &CancelToken,
) -> Result<()> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|idx| format!("benchdiff-build-{idx}"))
        .build()
        .map_err(|e| BenchError::Other(anyhow::anyhow!("failed to build worker pool: {e}")))?;

    let group = cancel.child();
    let failure: Mutex<Option<BenchError>> = Mutex::new(None);

    pool.install(|| {
        packages.into_par_iter().for_each(|package| {
            if group.is_cancelled() {
                return;
            }
            progress.set_message(package.import_path.clone());
            let outcome = compile_package(package, toolchain, scope, &group)
                .and_then(|()| list_benchmarks(package, toolchain, &group));
            progress.inc(1);

            if let Err(e) = outcome {
                let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
                match slot.take() {
                    Some(existing) => *slot = Some(first_error(existing, e)),
                    None => {
                        debug!(error = %e, "phase one failed, cancelling remaining tasks");
                        *slot = Some(e);
                        group.cancel();
                    }
                }
            }
        });
    });

    if let Some(e) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(e);
    }
    cancel.check()
}

/// Executes single benchmarks and turns their profiles into measurements.
pub struct Measurer<'a> {
    toolchain: &'a dyn Toolchain,
    collector: &'a ProfileCollector,
    options: &'a RunOptions,
}

impl<'a> Measurer<'a> {
    #[must_use]
    pub fn new(
        toolchain: &'a dyn Toolchain,
        collector: &'a ProfileCollector,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            toolchain,
            collector,
            options,
        }
    }

    /// Run `benchmark` from `package` once and collect its profiles.
    ///
    /// Profiles live in a private directory removed on return.
    ///
    /// # Errors
    ///
    /// Returns the execution, profile or cancellation error.
    pub fn measure(
        &self,
        package: &PackageRecord,
        benchmark: &str,
        cancel: &CancelToken,
    ) -> Result<BenchmarkMeasurement> {
        let binary = package
            .binary
            .as_deref()
            .ok_or_else(|| BenchError::BinaryNotCompiled {
                package: package.import_path.clone(),
            })?;
        let profile_dir = tempfile::Builder::new()
            .prefix("benchdiff-profile-")
            .tempdir()?;

        let artifacts = self.toolchain.run_benchmark(
            package,
            binary,
            benchmark,
            self.options,
            profile_dir.path(),
            cancel,
        )?;
        self.collector.collect(&artifacts)
    }
}

fn log_entry(builder: &ReportBuilder, idx: usize, entry: &ComparisonEntry<'_>) {
    let Some(run) = builder.report().runs.get(idx) else {
        return;
    };
    for result in &run.results {
        info!(
            benchmark = %entry.key,
            reason = %entry.reason,
            resource = %result.name,
            base = result.base.value,
            base_key = %result.base.key,
            head = result.head.value,
            head_key = %result.head.key,
            "benchmark measured"
        );
    }
}

/// Measure every plan entry in order, publishing after each measurement.
///
/// A failed measurement is logged and recorded as absent.
///
/// # Errors
///
/// Only cancellation and deadline errors abort the loop.
pub fn run_phase_two(
    plan: &[ComparisonEntry<'_>],
    measurer: &Measurer<'_>,
    builder: &mut ReportBuilder,
    publisher: &ReportPublisher,
    cancel: &CancelToken,
) -> Result<()> {
    for (idx, entry) in plan.iter().enumerate() {
        cancel.check()?;
        for side in RevisionSide::BOTH {
            let Some(package) = entry.side(side) else {
                continue;
            };
            debug!(benchmark = %entry.key, side = %side, "running benchmark");
            let measurement = match measurer.measure(package, &entry.key.benchmark, cancel) {
                Ok(measurement) => Some(measurement),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    error!(benchmark = %entry.key, side = %side, error = %e, "measurement failed");
                    None
                }
            };
            builder.record(idx, side, measurement);
            if let Some(output) = builder.raw_output(idx, side) {
                debug!(benchmark = %entry.key, side = %side, output, "benchmark output");
            }
            publisher.publish(builder.snapshot());
        }
        log_entry(builder, idx, entry);
    }
    Ok(())
}
