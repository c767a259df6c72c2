//! Package discovery for one revision.

use std::path::Path;

use tracing::{debug, info};

use super::{PackageRecord, count_with_tests};
use crate::error::{BenchError, Result};
use crate::toolchain::Toolchain;
use crate::util::CancelToken;

/// Enumerate every buildable package below `root`.
///
/// Packages without test sources stay in the list, flagged, and are skipped
/// by the compiler and lister.
///
/// # Errors
///
/// Returns `Discovery` if the toolchain cannot enumerate packages, or the
/// cancellation error if the run was cancelled.
pub fn discover_packages(
    toolchain: &dyn Toolchain,
    root: &Path,
    cancel: &CancelToken,
) -> Result<Vec<PackageRecord>> {
    let packages = toolchain.discover(root, cancel).map_err(|e| {
        if e.is_cancellation() {
            e
        } else {
            BenchError::Discovery {
                root: root.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;

    for pkg in packages.iter().filter(|p| !p.has_tests) {
        debug!(package = %pkg.import_path, "no test files, skipping");
    }
    info!(
        root = %root.display(),
        packages = packages.len(),
        with_tests = count_with_tests(&packages),
        "discovered packages"
    );
    Ok(packages)
}
