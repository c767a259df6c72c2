//! Revision workspaces.
//!
//! The head revision is the caller's working tree and is only read. The
//! base revision gets a disposable checkout whose removal is registered
//! with the run's [`ResourceScope`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bench::PackageRecord;
use crate::error::Result;
use crate::util::CancelToken;
use crate::vcs::Vcs;

pub mod scope;

pub use scope::ResourceScope;

/// Which of the two compared revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionSide {
    Base,
    Head,
}

impl RevisionSide {
    pub const BOTH: [Self; 2] = [Self::Base, Self::Head];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for RevisionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the comparison and the packages found in it.
#[derive(Debug, Clone)]
pub struct Revision {
    pub side: RevisionSide,
    /// Reference as given by the user (`HEAD~1`, a branch, a sha).
    pub reference: String,
    pub commit: String,
    pub root: PathBuf,
    pub packages: Vec<PackageRecord>,
}

impl Revision {
    #[must_use]
    pub fn new(
        side: RevisionSide,
        reference: impl Into<String>,
        commit: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            side,
            reference: reference.into(),
            commit: commit.into(),
            root: root.into(),
            packages: Vec::new(),
        }
    }
}

/// Resolves references and materializes revision workspaces.
pub struct WorkspaceManager<'s> {
    vcs: Arc<dyn Vcs>,
    scope: &'s ResourceScope,
}

impl<'s> WorkspaceManager<'s> {
    #[must_use]
    pub fn new(vcs: Arc<dyn Vcs>, scope: &'s ResourceScope) -> Self {
        Self { vcs, scope }
    }

    /// Resolve `reference` to a commit id.
    ///
    /// # Errors
    ///
    /// Returns `RevisionResolve` (fatal) if the reference is unknown.
    pub fn resolve(&self, reference: &str, cancel: &CancelToken) -> Result<String> {
        self.vcs.resolve(reference, cancel)
    }

    /// The head revision, rooted at the caller's working tree.
    ///
    /// # Errors
    ///
    /// Returns `RevisionResolve` if `reference` cannot be resolved.
    pub fn head(&self, reference: &str, working_tree: &Path, cancel: &CancelToken) -> Result<Revision> {
        let commit = self.resolve(reference, cancel)?;
        info!(reference, commit = %commit, "head revision");
        Ok(Revision::new(RevisionSide::Head, reference, commit, working_tree))
    }

    /// Check out the base revision into a disposable workspace.
    ///
    /// # Errors
    ///
    /// Returns `RevisionResolve` or `Checkout` on failure.
    pub fn checkout_base(&self, reference: &str, cancel: &CancelToken) -> Result<Revision> {
        let commit = self.resolve(reference, cancel)?;
        let root = self.vcs.create_isolated_checkout(&commit, cancel)?;

        let vcs = Arc::clone(&self.vcs);
        let checkout = root.clone();
        self.scope
            .register(format!("remove checkout {}", root.display()), move || {
                vcs.remove_checkout(&checkout)
            });

        info!(reference, commit = %commit, path = %root.display(), "base revision checked out");
        Ok(Revision::new(RevisionSide::Base, reference, commit, root))
    }
}
