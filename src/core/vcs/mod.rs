#[cfg(test)]
pub mod fixture;
pub mod system_git;

pub use system_git::SystemGit;

use crate::core::error::PostrelResult;
use std::path::{Path, PathBuf};

/// Primitive operations on one downstream working copy
///
/// Every call runs against [`RepositoryBackend::work_dir`]; implementations
/// never rely on the process working directory.
pub trait RepositoryBackend {
  /// Working directory all operations run in
  fn work_dir(&self) -> &Path;

  /// True iff tracked files have no uncommitted modifications
  ///
  /// An `Err` means the status query itself could not run and must be
  /// treated as fatal by callers.
  fn is_clean(&self) -> PostrelResult<bool>;

  /// Switch to an existing branch
  fn checkout(&self, branch: &str) -> PostrelResult<()>;

  /// Fetch and merge `remote/branch`; output is only shown on failure
  fn pull(&self, remote: &str, branch: &str) -> PostrelResult<()>;

  /// Create and switch to a new branch; fails if it already exists
  fn create_branch(&self, name: &str) -> PostrelResult<()>;

  /// Force-delete a local branch
  fn delete_branch(&self, name: &str) -> PostrelResult<()>;

  /// Stage exactly `paths` and commit with a sign-off trailer
  fn stage_and_commit(&self, paths: &[PathBuf], message: &str) -> PostrelResult<()>;

  /// Commit all modified tracked files with a sign-off trailer
  fn commit_tracked(&self, message: &str) -> PostrelResult<()>;

  fn push(&self, remote: &str, branch: &str) -> PostrelResult<()>;

  /// Create an annotated tag at HEAD and push it
  fn tag_and_push(&self, remote: &str, tag: &str, message: &str) -> PostrelResult<()>;

  /// True iff `tag` resolves locally
  fn has_tag(&self, tag: &str) -> bool;
}
