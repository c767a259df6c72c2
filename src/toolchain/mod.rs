//! Build/execute collaborator.
//!
//! The engine never shells out to a compiler directly; everything that
//! depends on the language toolchain sits behind [`Toolchain`].

use std::path::{Path, PathBuf};

use crate::bench::PackageRecord;
use crate::error::Result;
use crate::util::CancelToken;

pub mod go;

pub use go::GoToolchain;

/// Parameters for a single benchmark execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Minimum run duration per benchmark (toolchain syntax, e.g. `10s`).
    pub bench_time: String,
    /// How many times the benchmark is repeated.
    pub count: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            bench_time: "10s".to_string(),
            count: 1,
        }
    }
}

/// Files and text produced by one benchmark execution.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub cpu_profile: PathBuf,
    pub mem_profile: PathBuf,
    pub output: String,
}

impl RunArtifacts {
    /// Profile files in collection order.
    #[must_use]
    pub fn profiles(&self) -> [&Path; 2] {
        [&self.cpu_profile, &self.mem_profile]
    }
}

/// Language toolchain operations used by both run phases.
pub trait Toolchain: Send + Sync {
    /// Verify the toolchain is installed.
    ///
    /// # Errors
    ///
    /// Returns `MissingTool` when it is not.
    fn prerequisites(&self) -> Result<()>;

    /// Enumerate buildable packages below `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if enumeration fails or its output cannot be parsed.
    fn discover(&self, root: &Path, cancel: &CancelToken) -> Result<Vec<PackageRecord>>;

    /// Compile a standalone, reproducible test executable to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    fn compile_test_binary(
        &self,
        package: &PackageRecord,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<()>;

    /// Run `binary` in list-only mode and return one name per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable fails.
    fn list_benchmarks(
        &self,
        package: &PackageRecord,
        binary: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<String>>;

    /// Execute one benchmark, writing profiles into `profile_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable fails.
    fn run_benchmark(
        &self,
        package: &PackageRecord,
        binary: &Path,
        benchmark: &str,
        options: &RunOptions,
        profile_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RunArtifacts>;
}
