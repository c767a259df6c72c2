//! Version-control collaborator.
//!
//! The engine needs three capabilities: resolve a reference to a commit,
//! materialize an isolated checkout of a commit, and remove that checkout.
//! [`GitVcs`] implements them with `git rev-parse` and `git worktree`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{BenchError, Result};
use crate::util::{CancelToken, require_tool, run_checked};

/// Version-control operations used by the workspace manager.
pub trait Vcs: Send + Sync {
    /// Verify the underlying tool is available.
    ///
    /// # Errors
    ///
    /// Returns `MissingTool` when the tool is not installed.
    fn prerequisites(&self) -> Result<()>;

    /// Resolve a symbolic or relative reference to a full commit id.
    ///
    /// # Errors
    ///
    /// Returns `RevisionResolve` if the reference is unknown.
    fn resolve(&self, reference: &str, cancel: &CancelToken) -> Result<String>;

    /// Create a disposable checkout of `commit` and return its path.
    ///
    /// # Errors
    ///
    /// Returns `Checkout` if the checkout cannot be created.
    fn create_isolated_checkout(&self, commit: &str, cancel: &CancelToken) -> Result<PathBuf>;

    /// Remove a checkout created by [`Vcs::create_isolated_checkout`].
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_checkout(&self, path: &Path) -> Result<()>;
}

/// `git` command-line implementation rooted at a working tree.
#[derive(Debug, Clone)]
pub struct GitVcs {
    repo_dir: PathBuf,
}

impl GitVcs {
    #[must_use]
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_dir);
        cmd
    }
}

impl Vcs for GitVcs {
    fn prerequisites(&self) -> Result<()> {
        require_tool("git").map(|_| ())
    }

    fn resolve(&self, reference: &str, cancel: &CancelToken) -> Result<String> {
        let mut cmd = self.git();
        cmd.args(["rev-parse", "--verify"])
            .arg(format!("{reference}^{{commit}}"));
        let output = run_checked(&mut cmd, cancel).map_err(|e| match e {
            e if e.is_cancellation() => e,
            e => BenchError::RevisionResolve {
                reference: reference.to_string(),
                reason: e.to_string(),
            },
        })?;

        let commit = output.stdout_lossy().trim().to_string();
        if commit.is_empty() {
            return Err(BenchError::RevisionResolve {
                reference: reference.to_string(),
                reason: "git rev-parse printed nothing".to_string(),
            });
        }
        debug!(reference, commit = %commit, "resolved revision");
        Ok(commit)
    }

    fn create_isolated_checkout(&self, commit: &str, cancel: &CancelToken) -> Result<PathBuf> {
        let checkout_err = |reason: String| BenchError::Checkout {
            commit: commit.to_string(),
            reason,
        };

        let dir = tempfile::Builder::new()
            .prefix("benchdiff-base-")
            .tempdir()
            .map_err(|e| checkout_err(e.to_string()))?
            .keep();

        let mut cmd = self.git();
        cmd.args(["worktree", "add", "--detach"]).arg(&dir).arg(commit);
        if let Err(e) = run_checked(&mut cmd, cancel) {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(if e.is_cancellation() {
                e
            } else {
                checkout_err(e.to_string())
            });
        }

        debug!(commit, path = %dir.display(), "created base worktree");
        Ok(dir)
    }

    fn remove_checkout(&self, path: &Path) -> Result<()> {
        let mut cmd = self.git();
        cmd.args(["worktree", "remove", "--force"]).arg(path);
        // Teardown must run even after the run was cancelled.
        run_checked(&mut cmd, &CancelToken::new())?;
        debug!(path = %path.display(), "removed base worktree");
        Ok(())
    }
}
