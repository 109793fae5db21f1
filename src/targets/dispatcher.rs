//! Target dispatcher
//!
//! Runs the release workflow once per target, in order. A failing target is
//! reported and skipped; only fatal errors stop the pass.

use super::{RenderContext, TargetDescriptor, artifact_url};
use crate::core::checksum::{ChecksumPair, ChecksumSource};
use crate::core::config::ProjectConfig;
use crate::core::error::{ChecksumError, PostrelError, PostrelResult};
use crate::core::vcs::RepositoryBackend;
use crate::core::version::Version;
use crate::remote::{PullRequest, Submitter};
use crate::workflow::{Finalized, RepoUpdate, Step, Workflow};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How one target ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
  /// Branch pushed; PR URL when one was opened
  Finalized { branch: String, pull_request: Option<String> },
  /// Build file already carried the release; nothing committed or pushed
  UpToDate,
  Failed { step: Option<Step>, reason: String },
}

impl TargetOutcome {
  pub fn is_success(&self) -> bool {
    !matches!(self, TargetOutcome::Failed { .. })
  }
}

/// Per-target outcomes of one pass, in dispatch order
#[derive(Debug, Default)]
pub struct DispatchReport {
  pub outcomes: Vec<(String, TargetOutcome)>,
}

impl DispatchReport {
  pub fn get(&self, name: &str) -> Option<&TargetOutcome> {
    self.outcomes.iter().find(|(n, _)| n == name).map(|(_, o)| o)
  }

  pub fn succeeded(&self) -> usize {
    self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
  }

  pub fn failed(&self) -> usize {
    self.outcomes.len() - self.succeeded()
  }

  pub fn print_summary(&self) {
    println!("\n📦 Targets ({} updated, {} failed)", self.succeeded(), self.failed());
    for (name, outcome) in &self.outcomes {
      match outcome {
        TargetOutcome::Finalized {
          branch,
          pull_request: Some(url),
        } => println!("  ✅ {} ({}) {}", name, branch, url),
        TargetOutcome::Finalized { branch, .. } => println!("  ✅ {} ({})", name, branch),
        TargetOutcome::UpToDate => println!("  ✅ {} (already up to date)", name),
        TargetOutcome::Failed { step: Some(step), reason } => println!("  ❌ {} [{}] {}", name, step, reason),
        TargetOutcome::Failed { step: None, reason } => println!("  ❌ {}: {}", name, reason),
      }
    }
  }
}

/// Drives the workflow over an explicit, ordered target list
pub struct Dispatcher<'a, B, F>
where
  B: RepositoryBackend,
  F: Fn(&Path) -> PostrelResult<B>,
{
  project: &'a ProjectConfig,
  version: &'a Version,
  targets: Vec<TargetDescriptor>,
  open: F,
  checksums: &'a dyn ChecksumSource,
  submitter: Option<&'a dyn Submitter>,
  root: PathBuf,
  remote: String,
  user: String,
  _backend: PhantomData<fn() -> B>,
}

impl<'a, B, F> Dispatcher<'a, B, F>
where
  B: RepositoryBackend,
  F: Fn(&Path) -> PostrelResult<B>,
{
  pub fn new(
    project: &'a ProjectConfig,
    version: &'a Version,
    targets: Vec<TargetDescriptor>,
    open: F,
    checksums: &'a dyn ChecksumSource,
  ) -> Self {
    Self {
      project,
      version,
      targets,
      open,
      checksums,
      submitter: None,
      root: PathBuf::from("."),
      remote: String::new(),
      user: String::new(),
      _backend: PhantomData,
    }
  }

  pub fn with_submitter(mut self, submitter: &'a dyn Submitter) -> Self {
    self.submitter = Some(submitter);
    self
  }

  /// Directory relative target paths are resolved against
  pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.root = root.into();
    self
  }

  /// GitHub user (PR head owner) and the fork remote branches are pushed to
  pub fn with_github(mut self, user: impl Into<String>, remote: impl Into<String>) -> Self {
    self.user = user.into();
    self.remote = remote.into();
    self
  }

  /// Update every target; `Err` only for fatal errors
  pub fn dispatch(&self) -> PostrelResult<DispatchReport> {
    let mut report = DispatchReport::default();
    let mut cache: HashMap<String, Option<ChecksumPair>> = HashMap::new();

    for target in &self.targets {
      println!("\n------------------------------\n");
      println!("🌟 Updating: {} ...\n", target.name);

      match self.update_target(target, &mut cache) {
        Ok(outcome) => {
          if outcome == TargetOutcome::UpToDate {
            println!("✅ {} already up to date", target.name);
          } else {
            println!("✅ {} updated", target.name);
          }
          report.outcomes.push((target.name.clone(), outcome));
        }
        Err(e) if e.is_fatal() => {
          println!("❌ Updating {} failed: {}", target.name, e);
          return Err(e);
        }
        Err(e) => {
          println!("❌ Updating {} failed: {}", target.name, e);
          warn!(name = %target.name, error = %e, "target update failed");
          report.outcomes.push((
            target.name.clone(),
            TargetOutcome::Failed {
              step: e.step(),
              reason: e.to_string(),
            },
          ));
        }
      }
    }

    Ok(report)
  }

  /// Digests for `url`, fetched at most once per pass
  fn checksums_for(&self, url: &str, cache: &mut HashMap<String, Option<ChecksumPair>>) -> PostrelResult<ChecksumPair> {
    if let Some(cached) = cache.get(url) {
      debug!(url, "checksum cache hit");
      return cached.clone().ok_or_else(|| {
        PostrelError::Checksum(ChecksumError::Fetch {
          url: url.to_string(),
          reason: "already failed earlier in this run".to_string(),
        })
      });
    }

    let result = self.checksums.checksums(url);
    cache.insert(url.to_string(), result.as_ref().ok().cloned());
    result
  }

  fn update_target(
    &self,
    target: &TargetDescriptor,
    cache: &mut HashMap<String, Option<ChecksumPair>>,
  ) -> PostrelResult<TargetOutcome> {
    let url = artifact_url(self.project, self.version, target.artifact);
    let digests = self
      .checksums_for(&url, cache)
      .map_err(|e| PostrelError::at_step(Step::Checksum, e))?;

    let ctx = RenderContext {
      url,
      sha256: digests.sha256,
      sha512: digests.sha512,
      ..RenderContext::for_project(self.project, self.version)
    };
    let rules = target.rules(&ctx)?;
    let build_file = target.build_file(&ctx);

    let dir = target.work_dir(&self.root);
    let repo = (self.open)(&dir).map_err(|e| PostrelError::at_step(Step::Open, e))?;

    let update = RepoUpdate::new(&self.project.name, self.version.clone(), &self.remote)
      .with_message(target.message(&ctx))
      .with_base_branch(&self.project.base_branch);

    let Some(finalized) = Workflow::new(repo, update).run(&build_file, &rules)? else {
      return Ok(TargetOutcome::UpToDate);
    };
    debug!(
      branch = %finalized.branch,
      remote = %finalized.remote,
      replaced = finalized.patch.replaced,
      deleted = finalized.patch.deleted,
      "release branch pushed"
    );
    let pull_request = self.submit(target, &finalized)?;

    Ok(TargetOutcome::Finalized {
      branch: finalized.branch,
      pull_request,
    })
  }

  fn submit(&self, target: &TargetDescriptor, finalized: &Finalized) -> PostrelResult<Option<String>> {
    let Some(dest) = &target.pull_request else {
      return Ok(None);
    };
    let Some(submitter) = self.submitter else {
      println!("⚠️  No pull request submitter configured, skipping PR for {}", target.name);
      return Ok(None);
    };

    let pr = PullRequest {
      org: dest.org.clone(),
      repo: dest.repo.clone(),
      title: finalized.title().to_string(),
      head: format!("{}:{}", self.user, finalized.branch),
      base: dest.base.clone(),
      body: finalized.commit_message.clone(),
      maintainer_can_modify: true,
    };

    match submitter.open_pull_request(&pr) {
      Ok(url) => {
        println!("✅ GitHub PR created: {}", url);
        Ok(Some(url))
      }
      Err(e) => {
        println!("❌ Creating GitHub PR failed: {}", e);
        println!("Request: {:?}", pr);
        Err(PostrelError::at_step(Step::PullRequest, e))
      }
    }
  }
}
