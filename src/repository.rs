//! # Target Repository Access
//!
//! The committer never calls git directly. It goes through the
//! [`VcsOperations`] trait, so the branch and merge logic can be exercised
//! against an in-memory repository in tests while the real binary uses
//! [`DefaultVcsOperations`], which delegates to [`crate::git`].
//!
//! The operations are deliberately small: the committer decides which branch
//! a version belongs on and which commits are its parents; the backend only
//! moves references and records commits.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::git::{self, CommitIdentity};

/// Version-control operations the committer relies on.
pub trait VcsOperations {
    /// Working tree root.
    fn root(&self) -> &Path;

    /// Whether HEAD points at a commit.
    fn has_head(&self) -> Result<bool>;

    fn current_branch(&self) -> Result<Option<String>>;

    fn branch_exists(&self, branch: &str) -> Result<bool>;

    /// Points HEAD at `branch`, which may not exist yet.
    fn switch_branch(&self, branch: &str) -> Result<()>;

    /// Creates `branch` at `commit` without switching to it.
    fn create_branch(&self, branch: &str, commit: &str) -> Result<()>;

    /// Commit whose full message equals `message`, on any branch.
    fn find_commit_by_message(&self, message: &str) -> Result<Option<String>>;

    /// Message of the commit HEAD points at.
    fn tip_message(&self) -> Result<Option<String>>;

    fn stage_all(&self) -> Result<()>;

    /// Records a commit on the current branch whose parents are HEAD (if any)
    /// followed by the pending merge heads.
    fn commit(&self, message: &str, identity: &CommitIdentity) -> Result<()>;

    /// Sets the extra parents of the next commit.
    fn write_merge_heads(&self, commits: &[String]) -> Result<()>;
}

/// [`VcsOperations`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct DefaultVcsOperations {
    root: PathBuf,
}

impl DefaultVcsOperations {
    /// Opens the repository at `root`, initializing it if necessary.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        git::init(&root)?;
        log::debug!("Using repository {}", root.display());
        Ok(Self { root })
    }
}

impl VcsOperations for DefaultVcsOperations {
    fn root(&self) -> &Path {
        &self.root
    }

    fn has_head(&self) -> Result<bool> {
        Ok(git::head_commit(&self.root)?.is_some())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        git::current_branch(&self.root)
    }

    fn branch_exists(&self, branch: &str) -> Result<bool> {
        git::branch_exists(&self.root, branch)
    }

    fn switch_branch(&self, branch: &str) -> Result<()> {
        git::switch_branch(&self.root, branch)
    }

    fn create_branch(&self, branch: &str, commit: &str) -> Result<()> {
        git::create_branch(&self.root, branch, commit)
    }

    fn find_commit_by_message(&self, message: &str) -> Result<Option<String>> {
        git::find_commit_by_message(&self.root, message)
    }

    fn tip_message(&self) -> Result<Option<String>> {
        git::tip_message(&self.root)
    }

    fn stage_all(&self) -> Result<()> {
        git::stage_all(&self.root)
    }

    fn commit(&self, message: &str, identity: &CommitIdentity) -> Result<()> {
        git::commit(&self.root, message, identity)
    }

    fn write_merge_heads(&self, commits: &[String]) -> Result<()> {
        git::write_merge_heads(&self.root, commits)
    }
}
