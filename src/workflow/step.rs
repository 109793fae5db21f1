use std::fmt;

/// Named unit of work; every failure is reported against one of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
  Open,
  Checksum,
  Checkout,
  CleanCheck,
  Pull,
  Branch,
  Patch,
  Commit,
  Push,
  PullRequest,
  Tag,
  Render,
  Command,
  Sync,
  VersionFiles,
  Changelog,
  Milestone,
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Step::Open => "open repository",
      Step::Checksum => "checksum",
      Step::Checkout => "checkout",
      Step::CleanCheck => "clean check",
      Step::Pull => "pull",
      Step::Branch => "create branch",
      Step::Patch => "patch",
      Step::Commit => "commit",
      Step::Push => "push",
      Step::PullRequest => "pull request",
      Step::Tag => "tag",
      Step::Render => "render",
      Step::Command => "command",
      Step::Sync => "sync files",
      Step::VersionFiles => "write version files",
      Step::Changelog => "changelog",
      Step::Milestone => "milestone",
    };
    f.write_str(name)
  }
}

/// Lifecycle of one [`super::Workflow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
  Uninitialized,
  Prepared,
  Patched,
  Finalized,
  Failed,
}

impl fmt::Display for WorkflowState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      WorkflowState::Uninitialized => "uninitialized",
      WorkflowState::Prepared => "prepared",
      WorkflowState::Patched => "patched",
      WorkflowState::Finalized => "finalized",
      WorkflowState::Failed => "failed",
    };
    f.write_str(name)
  }
}
