//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A project checkout with a VERSION file and a website repository next to it
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
  pub website: PathBuf,
}

impl TestProject {
  /// `project/` with VERSION and a postrel.toml pointing at `site/`
  pub fn new(version: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().join("project");
    let website = root.path().join("site");
    std::fs::create_dir_all(&path)?;
    std::fs::create_dir_all(&website)?;

    std::fs::write(path.join("VERSION"), format!("{}\n", version))?;
    std::fs::write(
      path.join("postrel.toml"),
      r#"[website]
dir = "../site"
"#,
    )?;

    Ok(Self {
      _root: root,
      path,
      website,
    })
  }

  /// Turn the website directory into a git repository with a template
  pub fn init_website(&self, template: &str) -> Result<()> {
    git(&self.website, &["init", "--initial-branch=master"])?;
    git(&self.website, &["config", "user.name", "Test User"])?;
    git(&self.website, &["config", "user.email", "test@example.com"])?;
    std::fs::write(self.website.join("index.tpl"), template)?;
    git(&self.website, &["add", "."])?;
    git(&self.website, &["commit", "-m", "Initial website"])?;
    Ok(())
  }

  pub fn website_file(&self, name: &str) -> PathBuf {
    self.website.join(name)
  }

  pub fn commit_count(&self) -> Result<usize> {
    let output = git(&self.website, &["rev-list", "--count", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().parse()?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run postrel against `root` with no GitHub credentials in the environment
///
/// Does not check the exit status; callers assert on it.
pub fn run_postrel(root: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_postrel");

  Command::new(bin)
    .arg("-C")
    .arg(root)
    .args(args)
    .env_remove("GITHUB_TOKEN")
    .env_remove("GITHUB_USER")
    .env_remove("GITHUB_FORK")
    .env_remove("GOPASS_HTMLDIR")
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run postrel")
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}
