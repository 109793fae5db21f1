//! Collaboration-service seams: pull requests and milestones
//!
//! The release run only talks to GitHub through these traits, so tests can
//! check the exact payloads without a network.

pub mod github;
pub mod milestones;

pub use github::GitHubClient;
pub use milestones::sync_milestones;

use crate::core::error::PostrelResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pull request against a third-party repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
  #[serde(skip)]
  pub org: String,
  #[serde(skip)]
  pub repo: String,
  pub title: String,
  /// `<user>:<branch>`
  pub head: String,
  pub base: String,
  pub body: String,
  pub maintainer_can_modify: bool,
}

/// Opens pull requests; returns the PR's web URL
pub trait Submitter {
  fn open_pull_request(&self, pr: &PullRequest) -> PostrelResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_on: Option<DateTime<Utc>>,
}

/// Lists and creates milestones on one repository
pub trait MilestoneService {
  /// All milestones, open and closed
  fn list_milestones(&self, org: &str, repo: &str) -> PostrelResult<Vec<Milestone>>;

  fn create_milestone(&self, org: &str, repo: &str, milestone: &Milestone) -> PostrelResult<()>;
}
