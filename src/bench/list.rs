//! Benchmark enumeration from compiled test executables.

use tracing::debug;

use super::PackageRecord;
use crate::error::{BenchError, Result};
use crate::toolchain::Toolchain;
use crate::util::CancelToken;

const BENCHMARK_PREFIX: &str = "Benchmark";

/// Keep only benchmark entry points, one per output line.
#[must_use]
pub fn filter_benchmark_names<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let name = line.as_ref().trim();
            name.starts_with(BENCHMARK_PREFIX).then(|| name.to_string())
        })
        .collect()
}

/// Fill in `package.benchmarks` from its compiled binary.
///
/// # Errors
///
/// Returns `BinaryNotCompiled` when a package with tests has no binary,
/// `List` when the executable fails, or the cancellation error.
pub fn list_benchmarks(
    package: &mut PackageRecord,
    toolchain: &dyn Toolchain,
    cancel: &CancelToken,
) -> Result<()> {
    if !package.has_tests {
        return Ok(());
    }
    let binary = package
        .binary
        .clone()
        .ok_or_else(|| BenchError::BinaryNotCompiled {
            package: package.import_path.clone(),
        })?;

    let lines = toolchain
        .list_benchmarks(package, &binary, cancel)
        .map_err(|e| {
            if e.is_cancellation() {
                e
            } else {
                BenchError::List {
                    package: package.import_path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

    package.benchmarks = filter_benchmark_names(lines);
    debug!(
        package = %package.import_path,
        benchmarks = package.benchmarks.len(),
        "listed benchmarks"
    );
    Ok(())
}
