//! Reproducible test executable compilation and content hashing.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use super::PackageRecord;
use crate::error::{BenchError, Result};
use crate::toolchain::Toolchain;
use crate::util::{CancelToken, ContentHash};
use crate::workspace::ResourceScope;

/// Reserve a private file for a test binary and register its removal.
fn reserve_binary_path(scope: &ResourceScope) -> Result<PathBuf> {
    let path = tempfile::Builder::new()
        .prefix("benchdiff-test-bin-")
        .tempfile()?
        .into_temp_path()
        .keep()
        .map_err(|e| e.error)?;

    let owned = path.clone();
    scope.register(format!("remove {}", path.display()), move || {
        match fs::remove_file(&owned) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    });
    Ok(path)
}

/// Compile `package` and record the binary path and its content hash.
///
/// Packages without test sources are left untouched.
///
/// # Errors
///
/// Returns `Compile` if the toolchain fails, `EmptyBinary` if it produced a
/// zero-byte file, or the cancellation error.
pub fn compile_package(
    package: &mut PackageRecord,
    toolchain: &dyn Toolchain,
    scope: &ResourceScope,
    cancel: &CancelToken,
) -> Result<()> {
    if !package.has_tests {
        return Ok(());
    }
    cancel.check()?;

    let binary = reserve_binary_path(scope)?;
    toolchain
        .compile_test_binary(package, &binary, cancel)
        .map_err(|e| {
            if e.is_cancellation() {
                e
            } else {
                BenchError::Compile {
                    package: package.import_path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

    if fs::metadata(&binary)?.len() == 0 {
        return Err(BenchError::EmptyBinary {
            package: package.import_path.clone(),
            path: binary,
        });
    }

    let hash = ContentHash::of_file(&binary)?;
    debug!(
        package = %package.import_path,
        hash = %hash.short(),
        "compiled test binary"
    );
    package.binary = Some(binary);
    package.hash = Some(hash);
    Ok(())
}
