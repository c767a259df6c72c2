//! Go toolchain implementation.
//!
//! - discovery: `go list -json ./...`
//! - compile: `go test -trimpath -c -o <out> ./<rel>` from the module root
//! - list: `<binary> -test.list ^Benchmark`
//! - run: `<binary> -test.run ^$ -test.bench ^<name>$` with CPU and memory
//!   profiles

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use super::{RunArtifacts, RunOptions, Toolchain};
use crate::bench::PackageRecord;
use crate::error::{BenchError, Result};
use crate::util::{CancelToken, require_tool, run_checked};

const CPU_PROFILE: &str = "cpu.pprof";
const MEM_PROFILE: &str = "mem.pprof";

/// Subset of the `go list -json` package object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoPackage {
    dir: PathBuf,
    import_path: String,
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    module: Option<GoModule>,
    #[serde(default)]
    test_go_files: Vec<String>,
    #[serde(default)]
    x_test_go_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoModule {
    #[serde(default)]
    dir: Option<PathBuf>,
}

impl GoPackage {
    fn into_record(self, workspace_root: &Path) -> PackageRecord {
        let module_root = self
            .module
            .and_then(|m| m.dir)
            .or(self.root)
            .unwrap_or_else(|| workspace_root.to_path_buf());
        let has_tests = !self.test_go_files.is_empty() || !self.x_test_go_files.is_empty();
        PackageRecord::new(self.import_path, self.dir, module_root, has_tests)
    }
}

/// Parse the concatenated JSON objects printed by `go list -json`.
///
/// # Errors
///
/// Returns a JSON error if any object is malformed.
pub fn parse_go_list(output: &[u8], workspace_root: &Path) -> Result<Vec<PackageRecord>> {
    serde_json::Deserializer::from_slice(output)
        .into_iter::<GoPackage>()
        .map(|pkg| Ok(pkg?.into_record(workspace_root)))
        .collect()
}

/// Anchored `-test.bench` pattern selecting exactly one benchmark.
#[must_use]
pub fn bench_pattern(benchmark: &str) -> String {
    format!("^{}$", regex::escape(benchmark))
}

/// Go toolchain driven through the `go` command.
#[derive(Debug, Clone, Default)]
pub struct GoToolchain;

impl GoToolchain {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Toolchain for GoToolchain {
    fn prerequisites(&self) -> Result<()> {
        require_tool("go").map(|_| ())
    }

    fn discover(&self, root: &Path, cancel: &CancelToken) -> Result<Vec<PackageRecord>> {
        let mut cmd = Command::new("go");
        cmd.args(["list", "-json", "./..."]).current_dir(root);
        let output = run_checked(&mut cmd, cancel)?;
        parse_go_list(&output.stdout, root)
    }

    fn compile_test_binary(
        &self,
        package: &PackageRecord,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mut cmd = Command::new("go");
        cmd.args(["test", "-trimpath", "-c", "-o"])
            .arg(output)
            .arg(package.relative_dir())
            .current_dir(&package.module_root);
        run_checked(&mut cmd, cancel)?;
        Ok(())
    }

    fn list_benchmarks(
        &self,
        package: &PackageRecord,
        binary: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<String>> {
        let mut cmd = Command::new(binary);
        cmd.args(["-test.list", "^Benchmark"])
            .current_dir(&package.dir);
        let output = run_checked(&mut cmd, cancel)?;
        Ok(output.stdout_lossy().lines().map(str::to_string).collect())
    }

    fn run_benchmark(
        &self,
        package: &PackageRecord,
        binary: &Path,
        benchmark: &str,
        options: &RunOptions,
        profile_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RunArtifacts> {
        let cpu_profile = profile_dir.join(CPU_PROFILE);
        let mem_profile = profile_dir.join(MEM_PROFILE);

        let mut cmd = Command::new(binary);
        cmd.args(["-test.run", "^$", "-test.count"])
            .arg(options.count.to_string())
            .arg("-test.benchtime")
            .arg(&options.bench_time)
            .arg("-test.bench")
            .arg(bench_pattern(benchmark))
            .arg("-test.cpuprofile")
            .arg(&cpu_profile)
            .arg("-test.memprofile")
            .arg(&mem_profile)
            .arg("-test.benchmem")
            .current_dir(&package.dir);

        let output = run_checked(&mut cmd, cancel).map_err(|e| match e {
            e if e.is_cancellation() => e,
            e => BenchError::Benchmark {
                package: package.import_path.clone(),
                benchmark: benchmark.to_string(),
                reason: e.to_string(),
            },
        })?;
        debug!(
            package = %package.import_path,
            benchmark,
            "benchmark process finished"
        );

        Ok(RunArtifacts {
            cpu_profile,
            mem_profile,
            output: output.stdout_lossy(),
        })
    }
}
