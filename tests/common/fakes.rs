//! In-process stand-ins for git, the Go toolchain and the sharing service.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use benchdiff::bench::PackageRecord;
use benchdiff::profile::pprof::{Profile, Sample, ValueType};
use benchdiff::profile::{ProfileSharer, SharedProfile};
use benchdiff::toolchain::{RunArtifacts, RunOptions, Toolchain};
use benchdiff::util::CancelToken;
use benchdiff::vcs::Vcs;
use benchdiff::workspace::RevisionSide;
use benchdiff::{BenchError, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use prost::Message;
use std::io::Write;
use tempfile::TempDir;

pub const BASE_COMMIT: &str = "b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0";
pub const HEAD_COMMIT: &str = "f00df00df00df00df00df00df00df00df00df00d";

/// Resolves `HEAD~1` and `HEAD`, checks out into a scratch directory and
/// remembers removals.
pub struct FakeVcs {
    checkout: PathBuf,
    pub removed: Mutex<Vec<PathBuf>>,
}

impl FakeVcs {
    pub fn new(checkout: impl Into<PathBuf>) -> Self {
        Self {
            checkout: checkout.into(),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

impl Vcs for FakeVcs {
    fn prerequisites(&self) -> Result<()> {
        Ok(())
    }

    fn resolve(&self, reference: &str, _cancel: &CancelToken) -> Result<String> {
        match reference {
            "HEAD~1" => Ok(BASE_COMMIT.to_string()),
            "HEAD" => Ok(HEAD_COMMIT.to_string()),
            other => Err(BenchError::RevisionResolve {
                reference: other.to_string(),
                reason: "unknown revision".to_string(),
            }),
        }
    }

    fn create_isolated_checkout(&self, _commit: &str, _cancel: &CancelToken) -> Result<PathBuf> {
        fs::create_dir_all(&self.checkout)?;
        Ok(self.checkout.clone())
    }

    fn remove_checkout(&self, path: &Path) -> Result<()> {
        self.removed.lock().unwrap().push(path.to_path_buf());
        fs::remove_dir_all(path)?;
        Ok(())
    }
}

/// Resource totals written into the fake profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub cpu: i64,
    pub alloc_space: i64,
    pub alloc_objects: i64,
}

impl Resources {
    pub const fn new(cpu: i64, alloc_space: i64, alloc_objects: i64) -> Self {
        Self {
            cpu,
            alloc_space,
            alloc_objects,
        }
    }
}

/// One package as the fake toolchain reports it.
#[derive(Debug, Clone)]
pub struct FakePackage {
    pub import_path: String,
    pub has_tests: bool,
    /// Bytes of the compiled test binary; equal bytes mean unchanged code.
    pub content: String,
    pub benchmarks: Vec<String>,
}

impl FakePackage {
    pub fn new(import_path: &str, content: &str, benchmarks: &[&str]) -> Self {
        Self {
            import_path: import_path.to_string(),
            has_tests: true,
            content: content.to_string(),
            benchmarks: benchmarks.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn without_tests(import_path: &str) -> Self {
        Self {
            import_path: import_path.to_string(),
            has_tests: false,
            content: String::new(),
            benchmarks: Vec::new(),
        }
    }

    fn dir_name(&self) -> &str {
        self.import_path.rsplit('/').next().unwrap_or("pkg")
    }
}

/// A toolchain that "compiles" by writing package content to disk and
/// "runs" benchmarks by emitting pprof files with configured totals.
pub struct FakeToolchain {
    head_root: PathBuf,
    base: Vec<FakePackage>,
    head: Vec<FakePackage>,
    values: HashMap<(RevisionSide, String), Resources>,
    compile_failures: HashSet<String>,
    run_failures: HashSet<(RevisionSide, String)>,
    list_failures: HashSet<String>,
    slow_runs: HashMap<(RevisionSide, String), Duration>,
    cancel_after: Option<((RevisionSide, String), CancelToken)>,
    pub runs: Mutex<Vec<(RevisionSide, String)>>,
    pub compiled: AtomicUsize,
}

impl FakeToolchain {
    pub fn new(head_root: impl Into<PathBuf>) -> Self {
        Self {
            head_root: head_root.into(),
            base: Vec::new(),
            head: Vec::new(),
            values: HashMap::new(),
            compile_failures: HashSet::new(),
            run_failures: HashSet::new(),
            list_failures: HashSet::new(),
            slow_runs: HashMap::new(),
            cancel_after: None,
            runs: Mutex::new(Vec::new()),
            compiled: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_package(mut self, side: RevisionSide, package: FakePackage) -> Self {
        match side {
            RevisionSide::Base => self.base.push(package),
            RevisionSide::Head => self.head.push(package),
        }
        self
    }

    /// Totals for `import_path.Benchmark` on one side.
    #[must_use]
    pub fn with_values(mut self, side: RevisionSide, run: &str, values: Resources) -> Self {
        self.values.insert((side, run.to_string()), values);
        self
    }

    #[must_use]
    pub fn failing_compile(mut self, import_path: &str) -> Self {
        self.compile_failures.insert(import_path.to_string());
        self
    }

    #[must_use]
    pub fn failing_run(mut self, side: RevisionSide, run: &str) -> Self {
        self.run_failures.insert((side, run.to_string()));
        self
    }

    #[must_use]
    pub fn failing_list(mut self, import_path: &str) -> Self {
        self.list_failures.insert(import_path.to_string());
        self
    }

    /// Sleep for `delay` before producing the profiles of `run`.
    #[must_use]
    pub fn slow_run(mut self, side: RevisionSide, run: &str, delay: Duration) -> Self {
        self.slow_runs.insert((side, run.to_string()), delay);
        self
    }

    /// Fire `token` once `run` on `side` has produced its profiles.
    #[must_use]
    pub fn cancelling_after(mut self, side: RevisionSide, run: &str, token: CancelToken) -> Self {
        self.cancel_after = Some(((side, run.to_string()), token));
        self
    }

    pub fn runs(&self) -> Vec<(RevisionSide, String)> {
        self.runs.lock().unwrap().clone()
    }

    fn side_of(&self, package: &PackageRecord) -> RevisionSide {
        if package.module_root == self.head_root {
            RevisionSide::Head
        } else {
            RevisionSide::Base
        }
    }

    fn packages(&self, side: RevisionSide) -> &[FakePackage] {
        match side {
            RevisionSide::Base => &self.base,
            RevisionSide::Head => &self.head,
        }
    }

    fn find(&self, package: &PackageRecord) -> Option<&FakePackage> {
        self.packages(self.side_of(package))
            .iter()
            .find(|p| p.import_path == package.import_path)
    }
}

fn write_profile(path: &Path, types: &[(&str, &str)], values: &[i64]) -> Result<()> {
    let mut string_table = vec![String::new()];
    let mut sample_type = Vec::new();
    for (kind, unit) in types {
        string_table.push((*kind).to_string());
        string_table.push((*unit).to_string());
        let len = i64::try_from(string_table.len()).unwrap();
        sample_type.push(ValueType {
            r#type: len - 2,
            unit: len - 1,
        });
    }
    // Split every total over two samples so collection has to sum.
    let first: Vec<i64> = values.iter().map(|v| v / 2).collect();
    let second: Vec<i64> = values.iter().map(|v| v - v / 2).collect();
    let profile = Profile {
        sample_type,
        sample: vec![
            Sample {
                location_id: vec![1],
                value: first,
            },
            Sample {
                location_id: vec![2],
                value: second,
            },
        ],
        string_table,
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&profile.encode_to_vec())?;
    fs::write(path, encoder.finish()?)?;
    Ok(())
}

impl Toolchain for FakeToolchain {
    fn prerequisites(&self) -> Result<()> {
        Ok(())
    }

    fn discover(&self, root: &Path, _cancel: &CancelToken) -> Result<Vec<PackageRecord>> {
        let side = if root == self.head_root {
            RevisionSide::Head
        } else {
            RevisionSide::Base
        };
        Ok(self
            .packages(side)
            .iter()
            .map(|p| PackageRecord::new(&p.import_path, root.join(p.dir_name()), root, p.has_tests))
            .collect())
    }

    fn compile_test_binary(
        &self,
        package: &PackageRecord,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;
        if self.compile_failures.contains(&package.import_path) {
            return Err(BenchError::CommandFailed {
                command: "go test -c".to_string(),
                status: "exit status: 2".to_string(),
                stderr: "syntax error".to_string(),
            });
        }
        let content = self.find(package).map(|p| p.content.clone()).unwrap_or_default();
        fs::write(output, content)?;
        self.compiled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_benchmarks(
        &self,
        package: &PackageRecord,
        _binary: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<String>> {
        cancel.check()?;
        if self.list_failures.contains(&package.import_path) {
            return Err(BenchError::CommandFailed {
                command: "pkg.test -test.list ^Benchmark".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "flag provided but not defined".to_string(),
            });
        }
        let mut lines = self.find(package).map(|p| p.benchmarks.clone()).unwrap_or_default();
        lines.push("ok".to_string());
        Ok(lines)
    }

    fn run_benchmark(
        &self,
        package: &PackageRecord,
        _binary: &Path,
        benchmark: &str,
        _options: &RunOptions,
        profile_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<RunArtifacts> {
        cancel.check()?;
        let side = self.side_of(package);
        let run = format!("{}.{benchmark}", package.import_path);
        self.runs.lock().unwrap().push((side, run.clone()));

        if self.run_failures.contains(&(side, run.clone())) {
            return Err(BenchError::CommandFailed {
                command: format!("pkg.test -test.bench ^{benchmark}$"),
                status: "exit status: 1".to_string(),
                stderr: "panic: boom".to_string(),
            });
        }
        let key = (side, run);
        if let Some(delay) = self.slow_runs.get(&key) {
            thread::sleep(*delay);
        }
        let values = self
            .values
            .get(&key)
            .copied()
            .unwrap_or(Resources::new(1_000, 2_048, 16));

        let artifacts = RunArtifacts {
            cpu_profile: profile_dir.join("cpu.pprof"),
            mem_profile: profile_dir.join("mem.pprof"),
            output: format!("{benchmark}-8\t1\t{} ns/op\nPASS\n", values.cpu),
        };
        write_profile(
            &artifacts.cpu_profile,
            &[("samples", "count"), ("cpu", "nanoseconds")],
            &[10, values.cpu],
        )?;
        write_profile(
            &artifacts.mem_profile,
            &[
                ("alloc_objects", "count"),
                ("alloc_space", "bytes"),
                ("inuse_objects", "count"),
                ("inuse_space", "bytes"),
            ],
            &[values.alloc_objects, values.alloc_space, 0, 0],
        )?;
        if let Some((trigger, token)) = &self.cancel_after {
            if *trigger == key {
                token.cancel();
            }
        }
        Ok(artifacts)
    }
}

/// Hands out deterministic keys (`<file>-<n>`) or fails every upload.
pub struct FakeSharer {
    fail: bool,
    uploads: AtomicUsize,
}

impl FakeSharer {
    pub fn new() -> Self {
        Self {
            fail: false,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl ProfileSharer for FakeSharer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn share(&self, file_name: &str, _bytes: &[u8]) -> Result<SharedProfile> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BenchError::Share("service unavailable".to_string()));
        }
        Ok(SharedProfile {
            url: String::new(),
            key: format!("{}-{n}", file_name.trim_end_matches(".pprof")),
            sub_profiles: Vec::new(),
        })
    }
}

/// Scratch layout: a head working tree and a base checkout location.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir_all(dir.path().join("head")).expect("head dir");
        Self { dir }
    }

    pub fn head(&self) -> PathBuf {
        self.dir.path().join("head")
    }

    pub fn base(&self) -> PathBuf {
        self.dir.path().join("base-checkout")
    }
}
