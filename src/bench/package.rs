//! Package records discovered in one revision's workspace.

use std::path::{Path, PathBuf};

use crate::util::ContentHash;

/// One buildable package of a revision.
///
/// Created at discovery, then filled in by the compiler (binary path and
/// hash) and the lister (benchmark names). The compiled binary is removed
/// by the run's resource scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub import_path: String,
    pub dir: PathBuf,
    pub module_root: PathBuf,
    pub has_tests: bool,
    pub binary: Option<PathBuf>,
    pub hash: Option<ContentHash>,
    pub benchmarks: Vec<String>,
}

impl PackageRecord {
    #[must_use]
    pub fn new(
        import_path: impl Into<String>,
        dir: impl Into<PathBuf>,
        module_root: impl Into<PathBuf>,
        has_tests: bool,
    ) -> Self {
        Self {
            import_path: import_path.into(),
            dir: dir.into(),
            module_root: module_root.into(),
            has_tests,
            binary: None,
            hash: None,
            benchmarks: Vec::new(),
        }
    }

    /// Package directory relative to its module root, in `./rel` form.
    #[must_use]
    pub fn relative_dir(&self) -> String {
        let rel = self
            .dir
            .strip_prefix(&self.module_root)
            .unwrap_or_else(|_| Path::new(""));
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel.is_empty() {
            ".".to_string()
        } else {
            format!("./{rel}")
        }
    }

    /// Do both records carry the same compiled content?
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        matches!((self.hash, other.hash), (Some(a), Some(b)) if a == b)
    }
}

/// Count packages that contain test sources.
#[must_use]
pub fn count_with_tests(packages: &[PackageRecord]) -> usize {
    packages.iter().filter(|p| p.has_tests).count()
}
