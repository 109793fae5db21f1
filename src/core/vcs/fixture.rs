//! Throwaway git repositories for tests
//!
//! Layout inside one temp dir:
//! - `origin.git`: bare upstream, `master` branch
//! - `fork.git`: bare fork the workflow pushes release branches to
//! - `work`: clone of origin with `fork` configured as a second remote

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct GitFixture {
  _root: TempDir,
  pub origin: PathBuf,
  pub fork: PathBuf,
  pub work: PathBuf,
}

impl GitFixture {
  /// Create the fixture with `files` committed on master
  pub fn new(files: &[(&str, &str)]) -> Self {
    let root = TempDir::new().unwrap();
    let origin = root.path().join("origin.git");
    let fork = root.path().join("fork.git");
    let work = root.path().join("work");

    git(root.path(), &["init", "--bare", "--initial-branch=master", "origin.git"]);
    git(root.path(), &["init", "--bare", "--initial-branch=master", "fork.git"]);
    git(root.path(), &["init", "--initial-branch=master", "work"]);
    git(&work, &["config", "user.name", "Test User"]);
    git(&work, &["config", "user.email", "test@example.com"]);
    git(&work, &["config", "commit.gpgsign", "false"]);
    git(&work, &["config", "tag.gpgsign", "false"]);

    for (name, content) in files {
      let path = work.join(name);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
      }
      std::fs::write(path, content).unwrap();
    }
    git(&work, &["add", "."]);
    git(&work, &["commit", "-m", "Initial commit"]);

    git(&work, &["remote", "add", "origin", &origin.to_string_lossy()]);
    git(&work, &["remote", "add", "fork", &fork.to_string_lossy()]);
    git(&work, &["push", "-u", "origin", "master"]);

    Self {
      _root: root,
      origin,
      fork,
      work,
    }
  }

  /// Local branches of the working copy
  pub fn branches(&self) -> Vec<String> {
    git(&self.work, &["branch", "--format=%(refname:short)"])
      .lines()
      .map(str::to_string)
      .collect()
  }
}

/// Run git in `cwd`, panicking with stderr on failure; returns stdout
pub fn git(cwd: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .expect("Failed to run git command");

  if !output.status.success() {
    panic!(
      "Git command failed: git {}\n{}",
      args.join(" "),
      String::from_utf8_lossy(&output.stderr)
    );
  }

  String::from_utf8_lossy(&output.stdout).into_owned()
}
