//! System git backend
//!
//! Shells out to `git -C <work_dir>` for every operation, with an isolated
//! environment so user-level hooks or env overrides can't change behavior.

use super::RepositoryBackend;
use crate::core::error::{GitError, PostrelError, PostrelResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Environment variables passed through to git
///
/// Identity, ssh, proxy and askpass settings are needed for pull and push to
/// reach the forge; gpg and locale settings for signed commits.
const ENV_ALLOWLIST: &[&str] = &[
  "PATH",
  "HOME",
  "XDG_CONFIG_HOME",
  "LANG",
  "LC_ALL",
  "SSH_AUTH_SOCK",
  "SSH_ASKPASS",
  "GIT_SSH_COMMAND",
  "GIT_ASKPASS",
  "GIT_AUTHOR_NAME",
  "GIT_AUTHOR_EMAIL",
  "GIT_COMMITTER_NAME",
  "GIT_COMMITTER_EMAIL",
  "GPG_TTY",
  "GNUPGHOME",
  "HTTPS_PROXY",
  "HTTP_PROXY",
  "NO_PROXY",
  "ALL_PROXY",
  "https_proxy",
  "http_proxy",
  "no_proxy",
  "all_proxy",
];

/// Allowlisted variables that are set according to `lookup`
fn passthrough_env<F>(lookup: F) -> Vec<(&'static str, String)>
where
  F: Fn(&str) -> Option<String>,
{
  ENV_ALLOWLIST
    .iter()
    .filter_map(|key| lookup(key).map(|value| (*key, value)))
    .collect()
}

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) work_dir: PathBuf,
}

impl SystemGit {
  /// Open a git working copy
  ///
  /// Fails unless `path` is inside a git work tree, so no operation can ever
  /// run against an unset or bogus directory.
  pub fn open(path: &Path) -> PostrelResult<Self> {
    if !path.is_dir() {
      return Err(PostrelError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }

    let git = Self {
      work_dir: path.to_path_buf(),
    };
    let output = git
      .git_cmd()
      .args(["rev-parse", "--is-inside-work-tree"])
      .output()
      .map_err(|e| PostrelError::message(format!("Failed to execute git rev-parse: {}", e)))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(PostrelError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(PostrelError::message(format!("Failed to open git repository: {}", stderr)));
    }

    Ok(git)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Runs against the work dir via `-C`
  /// - Clears environment variables except an allowlist
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.work_dir);

    cmd.env_clear();
    cmd.envs(passthrough_env(|key| std::env::var(key).ok()));

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  /// Run `git <args>` and fail with the captured stderr on a non-zero exit
  fn run(&self, args: &[&str]) -> PostrelResult<Output> {
    let command = format!("git {}", args.join(" "));
    debug!(dir = %self.work_dir.display(), "Running command: {}", command);

    let output = self.git_cmd().args(args).output().map_err(|e| GitError::CommandFailed {
      command: command.clone(),
      stderr: e.to_string(),
    })?;

    if !output.status.success() {
      return Err(PostrelError::Git(GitError::CommandFailed {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(output)
  }

  /// Get current branch name
  #[cfg(test)]
  pub fn current_branch(&self) -> PostrelResult<String> {
    let output = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Check whether a local branch exists
  #[cfg(test)]
  pub fn has_branch(&self, name: &str) -> bool {
    self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", name)])
      .output()
      .map(|o| o.status.success())
      .unwrap_or(false)
  }
}

impl RepositoryBackend for SystemGit {
  fn work_dir(&self) -> &Path {
    &self.work_dir
  }

  fn is_clean(&self) -> PostrelResult<bool> {
    debug!(dir = %self.work_dir.display(), "Running command: git status --porcelain");

    let output = self
      .git_cmd()
      .args(["status", "--porcelain", "--untracked-files=no"])
      .output()
      .map_err(|e| GitError::StatusUnavailable {
        path: self.work_dir.clone(),
        reason: e.to_string(),
      })?;

    if !output.status.success() {
      return Err(PostrelError::Git(GitError::StatusUnavailable {
        path: self.work_dir.clone(),
        reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    let status = String::from_utf8_lossy(&output.stdout);
    if !status.trim().is_empty() {
      debug!(dir = %self.work_dir.display(), status = %status.trim(), "working tree is dirty");
      return Ok(false);
    }
    Ok(true)
  }

  fn checkout(&self, branch: &str) -> PostrelResult<()> {
    self.run(&["checkout", branch]).map(|_| ())
  }

  fn pull(&self, remote: &str, branch: &str) -> PostrelResult<()> {
    let command = format!("git pull {} {}", remote, branch);
    debug!(dir = %self.work_dir.display(), "Running command: {}", command);

    // pull output is long; keep it unless something goes wrong
    let output = self
      .git_cmd()
      .args(["pull", "--no-rebase", remote, branch])
      .output()
      .map_err(|e| GitError::CommandFailed {
        command: command.clone(),
        stderr: e.to_string(),
      })?;

    if !output.status.success() {
      let stdout = String::from_utf8_lossy(&output.stdout);
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PostrelError::Git(GitError::CommandFailed {
        command,
        stderr: format!("{}{}", stdout, stderr).trim().to_string(),
      }));
    }

    Ok(())
  }

  fn create_branch(&self, name: &str) -> PostrelResult<()> {
    self.run(&["checkout", "-b", name]).map(|_| ()).map_err(|e| match e {
      PostrelError::Git(GitError::CommandFailed { stderr, .. }) => PostrelError::Git(GitError::BranchError {
        message: format!("cannot create {}: {}", name, stderr),
      }),
      other => other,
    })
  }

  fn delete_branch(&self, name: &str) -> PostrelResult<()> {
    self.run(&["branch", "-D", name]).map(|_| ())
  }

  fn stage_and_commit(&self, paths: &[PathBuf], message: &str) -> PostrelResult<()> {
    if paths.is_empty() {
      return Err(PostrelError::message("Refusing to commit: no paths to stage"));
    }

    let path_args: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    let mut args = vec!["add", "--"];
    args.extend(path_args.iter().map(String::as_str));
    self.run(&args)?;

    self.run(&["commit", "-s", "-m", message]).map(|_| ())
  }

  fn commit_tracked(&self, message: &str) -> PostrelResult<()> {
    self.run(&["commit", "-a", "-s", "-m", message]).map(|_| ())
  }

  fn push(&self, remote: &str, branch: &str) -> PostrelResult<()> {
    self.run(&["push", remote, branch]).map(|_| ()).map_err(|e| match e {
      PostrelError::Git(GitError::CommandFailed { stderr, .. }) => PostrelError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        branch: branch.to_string(),
        reason: stderr,
      }),
      other => other,
    })
  }

  fn tag_and_push(&self, remote: &str, tag: &str, message: &str) -> PostrelResult<()> {
    self.run(&["tag", "-a", "-m", message, tag])?;
    self.push(remote, &format!("refs/tags/{}", tag))
  }

  fn has_tag(&self, tag: &str) -> bool {
    self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &format!("refs/tags/{}", tag)])
      .output()
      .map(|o| o.status.success())
      .unwrap_or(false)
  }
}
