use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug)]
pub struct CliRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

/// Empty directory used as both working directory and `HOME`.
pub struct CliWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl CliWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }
}

pub fn run_benchdiff<I, S>(workspace: &CliWorkspace, args: I) -> CliRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("benchdiff"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "benchdiff=debug");
    cmd.env("HOME", &workspace.root);
    for var in ["GITHUB_TOKEN", "GITHUB_REPOSITORY", "GITHUB_REF"] {
        cmd.env_remove(var);
    }
    for (key, _) in std::env::vars().filter(|(k, _)| k.starts_with("BENCHDIFF_")) {
        cmd.env_remove(key);
    }

    let output = cmd.output().expect("run benchdiff");
    CliRun {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
    }
}
