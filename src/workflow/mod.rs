//! Release-propagation workflow
//!
//! Drives one downstream working copy from an unknown state to a pushed,
//! PR-ready release branch:
//!
//! ```text
//! Uninitialized --prepare--> Prepared --patch--> Patched --finalize--> Finalized
//!        \______________________\___________________\____________> Failed
//! ```
//!
//! - **prepare**: checkout base, require a clean tree, pull, create the
//!   release branch (recreating a stale one exactly once)
//! - **patch**: rewrite the build-definition file with the target's rules
//! - **finalize**: commit that one file and push the branch to the fork
//!
//! A build file that already carries the release needs no commit; `run`
//! stops after patch and reports it as up to date.
//!
//! Re-running after a crash is safe: the branch name is a pure function of
//! the version, and a leftover branch is deleted and recreated from the
//! freshly pulled base.

#[cfg(test)]
pub(crate) mod fake;
mod step;

pub use step::{Step, WorkflowState};

use crate::core::error::{PostrelError, PostrelResult, WorkflowError};
use crate::core::patch::{self, PatchReport, PatchRuleSet};
use crate::core::vcs::RepositoryBackend;
use crate::core::version::Version;
use std::path::{Path, PathBuf};

/// Remote the base branch is pulled from
pub const DEFAULT_UPSTREAM: &str = "origin";

/// Base branch downstream repositories release from
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Release branch for `version`: `<prefix>-<version>`
pub fn branch_name(prefix: &str, version: &Version) -> String {
  format!("{}-{}", prefix, version)
}

/// Everything the workflow needs to know about one downstream update
#[derive(Debug, Clone)]
pub struct RepoUpdate {
  /// Project name; branch prefix and commit message subject
  pub project: String,
  pub version: Version,
  /// Commit message override
  pub message: Option<String>,
  /// Remote the release branch is pushed to (the fork)
  pub remote: String,
  /// Remote the base branch is pulled from
  pub upstream: String,
  pub base_branch: String,
}

impl RepoUpdate {
  pub fn new(project: impl Into<String>, version: Version, remote: impl Into<String>) -> Self {
    Self {
      project: project.into(),
      version,
      message: None,
      remote: remote.into(),
      upstream: DEFAULT_UPSTREAM.to_string(),
      base_branch: DEFAULT_BASE_BRANCH.to_string(),
    }
  }

  pub fn with_message(mut self, message: Option<String>) -> Self {
    self.message = message;
    self
  }

  pub fn with_base_branch(mut self, base_branch: impl Into<String>) -> Self {
    self.base_branch = base_branch.into();
    self
  }

  pub fn branch(&self) -> String {
    branch_name(&self.project, &self.version)
  }

  pub fn commit_message(&self) -> String {
    if let Some(message) = &self.message
      && !message.is_empty()
    {
      return message.clone();
    }

    format!(
      "{project}: update to {version}\nNote: This is an auto-generated change as part of the {project} release process.\n",
      project = self.project,
      version = self.version
    )
  }
}

/// Result of a successful run, ready for a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
  pub branch: String,
  pub remote: String,
  pub commit_message: String,
  pub patch: PatchReport,
}

impl Finalized {
  /// First line of the commit message
  pub fn title(&self) -> &str {
    self.commit_message.lines().next().unwrap_or_default()
  }
}

/// Prepare → Patch → Finalize over one repository
pub struct Workflow<B: RepositoryBackend> {
  repo: B,
  update: RepoUpdate,
  state: WorkflowState,
  patched: Option<PatchReport>,
}

impl<B: RepositoryBackend> Workflow<B> {
  pub fn new(repo: B, update: RepoUpdate) -> Self {
    Self {
      repo,
      update,
      state: WorkflowState::Uninitialized,
      patched: None,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> WorkflowState {
    self.state
  }

  #[cfg(test)]
  pub fn repo(&self) -> &B {
    &self.repo
  }

  fn enter(&self, expected: WorkflowState, next: WorkflowState) -> PostrelResult<()> {
    if self.state != expected {
      return Err(
        WorkflowError::InvalidTransition {
          from: self.state.to_string(),
          to: next.to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn fail(&mut self, step: Step, err: PostrelError) -> PostrelError {
    self.state = WorkflowState::Failed;
    PostrelError::at_step(step, err)
  }

  /// Checkout base, require a clean tree, pull, create the release branch
  pub fn prepare(&mut self) -> PostrelResult<()> {
    self.enter(WorkflowState::Uninitialized, WorkflowState::Prepared)?;
    println!("🌟 Running prepare ...");

    let base = self.update.base_branch.clone();
    if let Err(e) = self.repo.checkout(&base) {
      return Err(self.fail(Step::Checkout, e));
    }

    match self.repo.is_clean() {
      Ok(true) => {}
      Ok(false) => {
        let dirty = WorkflowError::DirtyWorkTree {
          path: self.repo.work_dir().to_path_buf(),
        };
        return Err(self.fail(Step::CleanCheck, dirty.into()));
      }
      Err(e) => return Err(self.fail(Step::CleanCheck, e)),
    }

    let upstream = self.update.upstream.clone();
    if let Err(e) = self.repo.pull(&upstream, &base) {
      return Err(self.fail(Step::Pull, e));
    }

    let branch = self.update.branch();
    if self.repo.create_branch(&branch).is_err() {
      // left over from an earlier, interrupted run
      println!("⚠️  Branch {} already exists, recreating it", branch);
      if let Err(e) = self.repo.delete_branch(&branch) {
        return Err(self.fail(Step::Branch, e));
      }
      if let Err(e) = self.repo.create_branch(&branch) {
        return Err(self.fail(Step::Branch, e));
      }
    }

    self.state = WorkflowState::Prepared;
    println!("✅ Prepared");
    Ok(())
  }

  /// Rewrite `build_file` (relative to the working directory) with `rules`
  pub fn patch(&mut self, build_file: &Path, rules: &PatchRuleSet) -> PostrelResult<PatchReport> {
    self.enter(WorkflowState::Prepared, WorkflowState::Patched)?;

    let path = self.repo.work_dir().join(build_file);
    let report = match patch::apply_rules(&path, rules) {
      Ok(report) => report,
      Err(e) => return Err(self.fail(Step::Patch, e)),
    };

    if !report.changed() {
      println!("⚠️  {} is already up to date", build_file.display());
    }

    self.patched = Some(report);
    self.state = WorkflowState::Patched;
    println!("✅ Built");
    Ok(report)
  }

  /// Commit the patched file and push the release branch to the fork
  pub fn finalize(&mut self, build_file: &Path) -> PostrelResult<Finalized> {
    self.enter(WorkflowState::Patched, WorkflowState::Finalized)?;
    println!("🌟 Running finalize ...");

    let message = self.update.commit_message();
    if let Err(e) = self.repo.stage_and_commit(&[PathBuf::from(build_file)], &message) {
      return Err(self.fail(Step::Commit, e));
    }

    let branch = self.update.branch();
    let remote = self.update.remote.clone();
    if let Err(e) = self.repo.push(&remote, &branch) {
      return Err(self.fail(Step::Push, e));
    }

    self.state = WorkflowState::Finalized;
    println!("✅ Finalized");
    Ok(Finalized {
      branch,
      remote,
      commit_message: message,
      patch: self.patched.unwrap_or_default(),
    })
  }

  /// Run all three phases; `None` when the patch changed nothing
  pub fn run(mut self, build_file: &Path, rules: &PatchRuleSet) -> PostrelResult<Option<Finalized>> {
    self.prepare()?;
    if !self.patch(build_file, rules)?.changed() {
      return Ok(None);
    }
    self.finalize(build_file).map(Some)
  }
}
