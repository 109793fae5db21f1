//! Error types for postrel with contextual messages and exit codes
//!
//! Every layer (repository handle, workflow, dispatcher) attaches its own
//! context on the way up. The dispatcher is the only place errors are
//! swallowed, and only when [`PostrelError::is_fatal`] says it may.

use crate::workflow::Step;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for postrel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, credentials, version file)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Validation failure (invalid configuration values)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for postrel
#[derive(Debug)]
pub enum PostrelError {
  /// Configuration and precondition errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Text-patch engine errors
  Patch(PatchError),

  /// Artifact download / digest errors
  Checksum(ChecksumError),

  /// Collaboration service (GitHub) errors
  Remote(RemoteError),

  /// Workflow state errors
  Workflow(WorkflowError),

  /// A failure inside a named workflow step
  Step { step: Step, source: Box<PostrelError> },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PostrelError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PostrelError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PostrelError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Wrap an error with the workflow step it happened in
  pub fn at_step(step: Step, source: PostrelError) -> Self {
    PostrelError::Step {
      step,
      source: Box::new(source),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PostrelError::Message { message, context, help } => PostrelError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      PostrelError::Io(e) => PostrelError::Message {
        message: ctx_str,
        context: Some(e.to_string()),
        help: None,
      },
      _ => self,
    }
  }

  /// The step this error was raised in, if it went through a workflow
  pub fn step(&self) -> Option<Step> {
    match self {
      PostrelError::Step { step, .. } => Some(*step),
      _ => None,
    }
  }

  /// Errors that must abort the whole run instead of only the current target
  pub fn is_fatal(&self) -> bool {
    match self {
      PostrelError::Git(GitError::StatusUnavailable { .. }) => true,
      PostrelError::Config(ConfigError::MissingCredentials { .. }) => true,
      PostrelError::Config(ConfigError::VersionFile { .. }) => true,
      PostrelError::Step { source, .. } => source.is_fatal(),
      _ => false,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PostrelError::Config(ConfigError::Invalid { .. }) => ExitCode::Validation,
      PostrelError::Config(_) => ExitCode::User,
      PostrelError::Git(_) => ExitCode::System,
      PostrelError::Patch(_) => ExitCode::System,
      PostrelError::Checksum(_) => ExitCode::System,
      PostrelError::Remote(_) => ExitCode::System,
      PostrelError::Workflow(_) => ExitCode::User,
      PostrelError::Step { source, .. } => source.exit_code(),
      PostrelError::Io(_) => ExitCode::System,
      PostrelError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PostrelError::Config(e) => e.help_message(),
      PostrelError::Git(e) => e.help_message(),
      PostrelError::Workflow(e) => e.help_message(),
      PostrelError::Step { source, .. } => source.help_message(),
      PostrelError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for PostrelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PostrelError::Config(e) => write!(f, "{}", e),
      PostrelError::Git(e) => write!(f, "{}", e),
      PostrelError::Patch(e) => write!(f, "{}", e),
      PostrelError::Checksum(e) => write!(f, "{}", e),
      PostrelError::Remote(e) => write!(f, "{}", e),
      PostrelError::Workflow(e) => write!(f, "{}", e),
      PostrelError::Step { step, source } => write!(f, "{} failed: {}", step, source),
      PostrelError::Io(e) => write!(f, "I/O error: {}", e),
      PostrelError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PostrelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PostrelError::Io(e) => Some(e),
      PostrelError::Patch(e) => Some(e.io()),
      PostrelError::Step { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for PostrelError {
  fn from(err: io::Error) -> Self {
    PostrelError::Io(err)
  }
}

impl From<String> for PostrelError {
  fn from(msg: String) -> Self {
    PostrelError::message(msg)
  }
}

impl From<&str> for PostrelError {
  fn from(msg: &str) -> Self {
    PostrelError::message(msg)
  }
}

impl From<ConfigError> for PostrelError {
  fn from(err: ConfigError) -> Self {
    PostrelError::Config(err)
  }
}

impl From<GitError> for PostrelError {
  fn from(err: GitError) -> Self {
    PostrelError::Git(err)
  }
}

impl From<PatchError> for PostrelError {
  fn from(err: PatchError) -> Self {
    PostrelError::Patch(err)
  }
}

impl From<ChecksumError> for PostrelError {
  fn from(err: ChecksumError) -> Self {
    PostrelError::Checksum(err)
  }
}

impl From<RemoteError> for PostrelError {
  fn from(err: RemoteError) -> Self {
    PostrelError::Remote(err)
  }
}

impl From<WorkflowError> for PostrelError {
  fn from(err: WorkflowError) -> Self {
    PostrelError::Workflow(err)
  }
}

impl From<toml_edit::de::Error> for PostrelError {
  fn from(err: toml_edit::de::Error) -> Self {
    PostrelError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for PostrelError {
  fn from(err: serde_json::Error) -> Self {
    PostrelError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for PostrelError {
  fn from(err: semver::Error) -> Self {
    PostrelError::message(format!("Version parse error: {}", err))
  }
}

impl From<regex::Error> for PostrelError {
  fn from(err: regex::Error) -> Self {
    PostrelError::message(format!("Regex error: {}", err))
  }
}

impl From<dialoguer::Error> for PostrelError {
  fn from(err: dialoguer::Error) -> Self {
    PostrelError::message(format!("Prompt error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Required environment variables are not set
  MissingCredentials { missing: Vec<String> },

  /// The version marker file is missing or unparsable
  VersionFile { path: PathBuf, reason: String },

  /// A configuration value is invalid
  Invalid { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingCredentials { .. } => Some(
        "Export GITHUB_TOKEN, GITHUB_USER and GITHUB_FORK, or run `postrel render` to only update the website."
          .to_string(),
      ),
      ConfigError::VersionFile { path, .. } => Some(format!(
        "Run postrel from the project root or check that {} contains a single semver line.",
        path.display()
      )),
      ConfigError::Invalid { .. } => Some("Check postrel.toml against the documented schema.".to_string()),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingCredentials { missing } => {
        write!(f, "Missing required environment: {}", missing.join(", "))
      }
      ConfigError::VersionFile { path, reason } => {
        write!(f, "Failed to read version from {}: {}", path.display(), reason)
      }
      ConfigError::Invalid { field, reason } => {
        write!(f, "Invalid configuration for {}: {}", field, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// `git status` itself could not be executed
  StatusUnavailable { path: PathBuf, reason: String },

  /// Branch operation failed
  BranchError { message: String },

  /// Push failed
  PushFailed {
    remote: String,
    branch: String,
    reason: String,
  },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote branch has commits you don't have. Delete the stale remote branch and re-run.".to_string())
        } else if reason.contains("ermission denied") || reason.contains("403") {
          Some("Check your SSH key permissions and that GITHUB_FORK names a remote you can push to.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Clone the repository first or point the directory override at it: {}",
        path.display()
      )),
      GitError::StatusUnavailable { .. } => Some("Make sure git is installed and on PATH.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::StatusUnavailable { path, reason } => {
        write!(f, "Cannot query git status in {}: {}", path.display(), reason)
      }
      GitError::BranchError { message } => {
        write!(f, "Branch operation failed: {}", message)
      }
      GitError::PushFailed { remote, branch, reason } => {
        write!(f, "Push to {}/{} failed: {}", remote, branch, reason)
      }
    }
  }
}

/// Text-patch engine I/O errors
#[derive(Debug)]
pub enum PatchError {
  /// The source file could not be opened or read
  Read { path: PathBuf, source: io::Error },

  /// The temporary sibling could not be created or written
  Write { path: PathBuf, source: io::Error },

  /// The temporary sibling could not be renamed over the original
  Rename { path: PathBuf, source: io::Error },
}

impl PatchError {
  fn io(&self) -> &io::Error {
    match self {
      PatchError::Read { source, .. } | PatchError::Write { source, .. } | PatchError::Rename { source, .. } => {
        source
      }
    }
  }
}

impl fmt::Display for PatchError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PatchError::Read { path, source } => write!(f, "Failed to read {}: {}", path.display(), source),
      PatchError::Write { path, source } => {
        write!(f, "Failed to write staged copy of {}: {}", path.display(), source)
      }
      PatchError::Rename { path, source } => {
        write!(f, "Failed to replace {}: {}", path.display(), source)
      }
    }
  }
}

/// Artifact download errors
#[derive(Debug)]
pub enum ChecksumError {
  /// Request failed or returned a non-success status
  Fetch { url: String, reason: String },

  /// The body stream broke partway through
  Read { url: String, reason: String },
}

impl fmt::Display for ChecksumError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChecksumError::Fetch { url, reason } => write!(f, "Failed to fetch {}: {}", url, reason),
      ChecksumError::Read { url, reason } => write!(f, "Failed to read body of {}: {}", url, reason),
    }
  }
}

/// Collaboration service errors
#[derive(Debug)]
pub enum RemoteError {
  /// The request could not be sent or the response not decoded
  Request { endpoint: String, reason: String },

  /// The API answered with an error status
  Api {
    endpoint: String,
    status: u16,
    request: String,
    response: String,
  },
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemoteError::Request { endpoint, reason } => write!(f, "Request to {} failed: {}", endpoint, reason),
      RemoteError::Api {
        endpoint,
        status,
        request,
        response,
      } => write!(
        f,
        "{} returned HTTP {}\nRequest: {}\nResponse: {}",
        endpoint, status, request, response
      ),
    }
  }
}

/// Workflow state errors
#[derive(Debug)]
pub enum WorkflowError {
  /// Uncommitted changes in the working tree
  DirtyWorkTree { path: PathBuf },

  /// A phase was called out of order
  InvalidTransition { from: String, to: String },
}

impl WorkflowError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkflowError::DirtyWorkTree { path } => Some(format!(
        "Commit or stash your local changes in {} and re-run.",
        path.display()
      )),
      WorkflowError::InvalidTransition { .. } => None,
    }
  }
}

impl fmt::Display for WorkflowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkflowError::DirtyWorkTree { path } => write!(f, "working tree dirty at {}", path.display()),
      WorkflowError::InvalidTransition { from, to } => {
        write!(f, "cannot move from {} to {}", from, to)
      }
    }
  }
}

/// Result type alias for postrel
pub type PostrelResult<T> = Result<T, PostrelError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PostrelResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PostrelResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PostrelError>,
{
  fn context(self, ctx: impl Into<String>) -> PostrelResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PostrelResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &PostrelError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_step_wrapping_keeps_fatality() {
    let err = PostrelError::at_step(
      Step::CleanCheck,
      PostrelError::Git(GitError::StatusUnavailable {
        path: PathBuf::from("/tmp/x"),
        reason: "no git".to_string(),
      }),
    );
    assert!(err.is_fatal());
    assert_eq!(err.step(), Some(Step::CleanCheck));
    assert_eq!(err.exit_code(), ExitCode::System);
  }

  #[test]
  fn test_dirty_tree_is_not_fatal() {
    let err = PostrelError::at_step(
      Step::CleanCheck,
      WorkflowError::DirtyWorkTree {
        path: PathBuf::from("/tmp/x"),
      }
      .into(),
    );
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("working tree dirty"));
    assert!(err.help_message().is_some());
  }

  #[test]
  fn test_context_on_message() {
    let err = PostrelError::message("boom").context("while testing");
    assert_eq!(err.to_string(), "boom\nwhile testing");
  }

  #[test]
  fn test_missing_credentials_exit_code() {
    let err: PostrelError = ConfigError::MissingCredentials {
      missing: vec!["GITHUB_TOKEN".to_string()],
    }
    .into();
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), ExitCode::User);
    assert!(err.to_string().contains("GITHUB_TOKEN"));
  }
}
