//! Integration repositories
//!
//! Companion tools that depend on the released project get bumped to the
//! new version, committed on their base branch and tagged with the same tag.
//! Each integration is isolated: one failing does not stop the others.

mod toolchain;

pub use toolchain::detect_toolchain;

use crate::core::changelog;
use crate::core::config::{IntegrationConfig, ProjectConfig};
use crate::core::error::{PostrelError, PostrelResult, WorkflowError};
use crate::core::patch::write_atomic;
use crate::core::vcs::RepositoryBackend;
use crate::core::version::Version;
use crate::utils::{copy_file, expand, run_command};
use crate::workflow::Step;
use regex::Regex;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Runs one external tool invocation in a checkout
pub trait CommandRunner {
  fn run(&self, dir: &Path, argv: &[String]) -> PostrelResult<()>;
}

/// Runs commands as child processes with inherited output
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, dir: &Path, argv: &[String]) -> PostrelResult<()> {
    run_command(dir, argv)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
  Updated,
  /// The tag existed before the run; nothing was touched
  AlreadyTagged,
  Failed { step: Option<Step>, reason: String },
}

#[derive(Debug, Default)]
pub struct IntegrationReport {
  pub outcomes: Vec<(String, IntegrationOutcome)>,
}

impl IntegrationReport {
  pub fn get(&self, name: &str) -> Option<&IntegrationOutcome> {
    self.outcomes.iter().find(|(n, _)| n == name).map(|(_, o)| o)
  }

  pub fn failed(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|(_, o)| matches!(o, IntegrationOutcome::Failed { .. }))
      .count()
  }

  pub fn print_summary(&self) {
    println!("\n🔌 Integrations ({} failed)", self.failed());
    for (name, outcome) in &self.outcomes {
      match outcome {
        IntegrationOutcome::Updated => println!("  ✅ {} updated", name),
        IntegrationOutcome::AlreadyTagged => println!("  ✅ {} already tagged", name),
        IntegrationOutcome::Failed { step: Some(step), reason } => println!("  ❌ {} [{}] {}", name, step, reason),
        IntegrationOutcome::Failed { step: None, reason } => println!("  ❌ {}: {}", name, reason),
      }
    }
  }
}

/// Bumps every configured integration to `version`
pub struct IntegrationUpdater<'a, B, F>
where
  B: RepositoryBackend,
  F: Fn(&Path) -> PostrelResult<B>,
{
  config: &'a IntegrationConfig,
  project: &'a ProjectConfig,
  version: &'a Version,
  /// Project root; source of synced files
  root: PathBuf,
  /// Directory the integration checkouts live in
  dir: PathBuf,
  toolchain: Option<String>,
  open: F,
  runner: &'a dyn CommandRunner,
  _backend: PhantomData<fn() -> B>,
}

impl<'a, B, F> IntegrationUpdater<'a, B, F>
where
  B: RepositoryBackend,
  F: Fn(&Path) -> PostrelResult<B>,
{
  pub fn new(
    config: &'a IntegrationConfig,
    project: &'a ProjectConfig,
    version: &'a Version,
    open: F,
    runner: &'a dyn CommandRunner,
  ) -> Self {
    Self {
      config,
      project,
      version,
      root: PathBuf::from("."),
      dir: PathBuf::from(".."),
      toolchain: config.toolchain.clone(),
      open,
      runner,
      _backend: PhantomData,
    }
  }

  /// Project root and the directory holding the integration checkouts
  pub fn with_dirs(mut self, root: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
    self.root = root.into();
    self.dir = dir.into();
    self
  }

  /// Toolchain version used when none is configured
  pub fn with_detected_toolchain(mut self, toolchain: Option<String>) -> Self {
    if self.toolchain.is_none() {
      self.toolchain = toolchain;
    }
    self
  }

  /// Update every integration; `Err` only for fatal errors
  pub fn update_all(&self) -> PostrelResult<IntegrationReport> {
    let mut report = IntegrationReport::default();

    for name in &self.config.names {
      println!("\n------------------------------\n");
      println!("🌟 Updating: {} ...\n", name);

      match self.update_one(name) {
        Ok(outcome) => {
          println!("✅ Integration {} is up to date.", name);
          report.outcomes.push((name.clone(), outcome));
        }
        Err(e) if e.is_fatal() => {
          println!("❌ Updating {} failed: {}", name, e);
          return Err(e);
        }
        Err(e) => {
          println!("❌ Updating {} failed: {}", name, e);
          warn!(integration = %name, error = %e, "integration update failed");
          report.outcomes.push((
            name.clone(),
            IntegrationOutcome::Failed {
              step: e.step(),
              reason: e.to_string(),
            },
          ));
        }
      }
    }

    Ok(report)
  }

  fn update_one(&self, name: &str) -> PostrelResult<IntegrationOutcome> {
    let path = self.dir.join(name);
    let repo = (self.open)(&path).map_err(|e| PostrelError::at_step(Step::Open, e))?;
    let tag = self.version.tag();
    let base = &self.project.base_branch;

    if repo.has_tag(&tag) {
      println!("✅ Integration {} has tag {} already.", name, tag);
      return Ok(IntegrationOutcome::AlreadyTagged);
    }
    println!("✅ [{}] {} is not tagged, yet.", name, tag);

    match repo.is_clean() {
      Ok(true) => println!("✅ [{}] Git is clean.", name),
      Ok(false) => {
        let dirty = WorkflowError::DirtyWorkTree { path: path.clone() };
        return Err(PostrelError::at_step(Step::CleanCheck, dirty.into()));
      }
      Err(e) => return Err(PostrelError::at_step(Step::CleanCheck, e)),
    }

    repo
      .pull("origin", base)
      .map_err(|e| PostrelError::at_step(Step::Pull, e))?;

    for argv in &self.config.commands {
      let argv = self
        .render_command(argv)
        .and_then(|argv| self.runner.run(&path, &argv).map(|_| argv))
        .map_err(|e| PostrelError::at_step(Step::Command, e))?;
      println!("✅ [{}] {}", name, argv.join(" "));
    }

    for file in &self.config.sync_files {
      copy_file(&self.root.join(file), &path.join(file)).map_err(|e| PostrelError::at_step(Step::Sync, e))?;
      println!("✅ [{}] synced {}.", name, file);
    }

    let written = update_workflows(&path, self.toolchain.as_deref()).map_err(|e| PostrelError::at_step(Step::Sync, e))?;
    println!("✅ [{}] updated {} workflow(s).", name, written);

    self
      .write_version_files(&path)
      .map_err(|e| PostrelError::at_step(Step::VersionFiles, e))?;
    println!("✅ [{}] wrote VERSION and {}.", name, self.config.version_source);

    changelog::prepend_entry(&path.join(&self.config.changelog), self.version, &self.project.name)
      .map_err(|e| PostrelError::at_step(Step::Changelog, e))?;
    println!("✅ [{}] wrote {}.", name, self.config.changelog);

    repo
      .commit_tracked(&format!("Update to {}", tag))
      .map_err(|e| PostrelError::at_step(Step::Commit, e))?;
    repo
      .push("origin", base)
      .map_err(|e| PostrelError::at_step(Step::Push, e))?;
    println!("✅ [{}] committed.", name);

    repo
      .tag_and_push("origin", &tag, &format!("Tag {}", tag))
      .map_err(|e| PostrelError::at_step(Step::Tag, e))?;
    println!("✅ [{}] tagged.", name);

    Ok(IntegrationOutcome::Updated)
  }

  fn render_command(&self, argv: &[String]) -> PostrelResult<Vec<String>> {
    let tag = self.version.tag();
    let version = self.version.to_string();
    let toolchain = self.toolchain.as_deref().unwrap_or_default();

    argv
      .iter()
      .map(|arg| {
        if arg.contains("{toolchain}") && toolchain.is_empty() {
          return Err(unknown_toolchain());
        }
        Ok(expand(
          arg,
          &[
            ("tag", tag.as_str()),
            ("version", version.as_str()),
            ("toolchain", toolchain),
            ("org", self.project.org.as_str()),
            ("repo", self.project.repo.as_str()),
          ],
        ))
      })
      .collect()
  }

  fn write_version_files(&self, path: &Path) -> PostrelResult<()> {
    write_atomic(&path.join("VERSION"), format!("{}\n", self.version).as_bytes())?;
    write_atomic(
      &path.join(&self.config.version_source),
      version_source(self.version).as_bytes(),
    )
  }
}

fn unknown_toolchain() -> PostrelError {
  PostrelError::with_help(
    "Toolchain version is unknown",
    "Set integration.toolchain in postrel.toml or make `go` available on PATH.",
  )
}

/// `go-version: X.Y` in workflow files
const GO_VERSION_PATTERN: &str = r"go-version:\s+\d+\.\d+";

/// Point every `.yml` under `.github/workflows` at `toolchain`
///
/// Files are only written when their content changes. Returns how many
/// files were written.
pub fn update_workflows(checkout: &Path, toolchain: Option<&str>) -> PostrelResult<usize> {
  let workflows = checkout.join(".github").join("workflows");
  if !workflows.is_dir() {
    debug!(dir = %workflows.display(), "no workflows directory");
    return Ok(0);
  }

  let re = Regex::new(GO_VERSION_PATTERN)?;
  let mut written = 0;

  for file in yaml_files(&workflows)? {
    let content = fs::read_to_string(&file)?;
    if !re.is_match(&content) {
      continue;
    }
    let Some(toolchain) = toolchain else {
      return Err(unknown_toolchain());
    };

    let replacement = format!("go-version: {}", toolchain);
    let updated = re.replace_all(&content, regex::NoExpand(&replacement));
    if updated == content {
      continue;
    }

    write_atomic(&file, updated.as_bytes())?;
    println!("Wrote {}", file.display());
    written += 1;
  }

  Ok(written)
}

/// Every `*.yml` file below `dir`, in a stable order
fn yaml_files(dir: &Path) -> PostrelResult<Vec<PathBuf>> {
  let mut files = Vec::new();
  let mut pending = vec![dir.to_path_buf()];

  while let Some(current) = pending.pop() {
    for entry in fs::read_dir(&current)? {
      let path = entry?.path();
      if path.is_dir() {
        pending.push(path);
      } else if path.extension().is_some_and(|ext| ext == "yml") {
        files.push(path);
      }
    }
  }

  files.sort();
  Ok(files)
}

/// Source file embedding the development fallback of `version`
pub fn version_source(version: &Version) -> String {
  let dev = version.development();
  format!(
    r#"package main

import (
	"strings"

	"github.com/blang/semver/v4"
)

func getVersion() semver.Version {{
	sv, err := semver.Parse(strings.TrimPrefix(version, "v"))
	if err == nil {{
		return sv
	}}

	return semver.Version{{
		Major: {major},
		Minor: {minor},
		Patch: {patch},
		Pre: []semver.PRVersion{{
			{{VersionStr: "{pre}"}},
		}},
		Build: []string{{"{build}"}},
	}}
}}
"#,
    major = dev.major(),
    minor = dev.minor(),
    patch = dev.patch(),
    pre = dev.pre(),
    build = dev.build(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::workflow::fake::{CallLog, FakeRepo};
  use std::cell::RefCell;
  use tempfile::TempDir;

  #[derive(Default)]
  struct RecordingRunner {
    runs: RefCell<Vec<(PathBuf, Vec<String>)>>,
  }

  impl CommandRunner for RecordingRunner {
    fn run(&self, dir: &Path, argv: &[String]) -> PostrelResult<()> {
      self.runs.borrow_mut().push((dir.to_path_buf(), argv.to_vec()));
      Ok(())
    }
  }

  const WORKFLOW: &str = "jobs:\n  build:\n    steps:\n      - uses: actions/setup-go@v5\n        with:\n          go-version: 1.21\n";

  /// Project root plus integration checkouts next to it
  fn layout(names: &[&str]) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("gopass");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join(".golangci.yml"), "linters: {}\n").unwrap();

    for name in names {
      let dir = tmp.path().join(name);
      std::fs::create_dir_all(dir.join(".github/workflows")).unwrap();
      std::fs::write(dir.join(".github/workflows/build.yml"), WORKFLOW).unwrap();
      std::fs::write(dir.join("CHANGELOG.md"), "## 1.2.3\n\n- Older\n").unwrap();
    }
    let parent = tmp.path().to_path_buf();
    (tmp, root, parent)
  }

  fn config(names: &[&str]) -> IntegrationConfig {
    IntegrationConfig {
      names: names.iter().map(|n| n.to_string()).collect(),
      toolchain: Some("1.22".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn test_isolated_updates() {
    let names = ["tagged", "fresh", "dirty"];
    let (_tmp, root, parent) = layout(&names);
    let config = config(&names);
    let project = ProjectConfig::default();
    let version = Version::new(1, 2, 4);
    let runner = RecordingRunner::default();
    let log = CallLog::default();

    let open = |dir: &Path| -> PostrelResult<FakeRepo> {
      let repo = FakeRepo::at(dir, log.clone());
      Ok(if dir.ends_with("tagged") {
        repo.with_tag("v1.2.4")
      } else if dir.ends_with("dirty") {
        repo.dirty()
      } else {
        repo
      })
    };

    let report = IntegrationUpdater::new(&config, &project, &version, open, &runner)
      .with_dirs(&root, &parent)
      .update_all()
      .unwrap();

    assert_eq!(report.get("tagged"), Some(&IntegrationOutcome::AlreadyTagged));
    assert_eq!(report.get("fresh"), Some(&IntegrationOutcome::Updated));
    assert!(matches!(
      report.get("dirty"),
      Some(IntegrationOutcome::Failed {
        step: Some(Step::CleanCheck),
        ..
      })
    ));

    // commands only ran for the fresh checkout, with placeholders expanded
    let runs = runner.runs.borrow();
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|(dir, _)| dir.ends_with("fresh")));
    assert_eq!(runs[0].1, vec!["make", "upgrade"]);
    assert_eq!(runs[1].1, vec!["go", "get", "github.com/gopasspw/gopass@v1.2.4"]);
    assert_eq!(runs[2].1, vec!["go", "mod", "edit", "-go=1.22"]);

    let fresh = parent.join("fresh");
    assert_eq!(std::fs::read_to_string(fresh.join("VERSION")).unwrap(), "1.2.4\n");
    assert_eq!(std::fs::read_to_string(fresh.join(".golangci.yml")).unwrap(), "linters: {}\n");
    assert!(
      std::fs::read_to_string(fresh.join(".github/workflows/build.yml"))
        .unwrap()
        .contains("go-version: 1.22\n")
    );
    assert!(
      std::fs::read_to_string(fresh.join("CHANGELOG.md"))
        .unwrap()
        .starts_with("## 1.2.4\n\n- Bump dependencies to gopass release v1.2.4\n")
    );

    let calls = log.borrow();
    let tail: Vec<&str> = calls.iter().map(String::as_str).filter(|c| !c.starts_with("is_clean")).collect();
    assert!(tail.contains(&"commit_tracked"));
    assert!(tail.contains(&"push origin master"));
    assert!(tail.contains(&"tag_and_push origin v1.2.4"));
  }

  #[test]
  fn test_unknown_toolchain_fails_command_step() {
    let names = ["fresh"];
    let (_tmp, root, parent) = layout(&names);
    let config = IntegrationConfig {
      toolchain: None,
      ..config(&names)
    };
    let project = ProjectConfig::default();
    let version = Version::new(1, 2, 4);
    let runner = RecordingRunner::default();
    let log = CallLog::default();

    let open = |dir: &Path| -> PostrelResult<FakeRepo> { Ok(FakeRepo::at(dir, log.clone())) };
    let report = IntegrationUpdater::new(&config, &project, &version, open, &runner)
      .with_dirs(&root, &parent)
      .with_detected_toolchain(None)
      .update_all()
      .unwrap();

    match report.get("fresh") {
      Some(IntegrationOutcome::Failed { step, reason }) => {
        assert_eq!(*step, Some(Step::Command));
        assert!(reason.contains("Toolchain version is unknown"));
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
    // `make upgrade` and `go get` ran before the toolchain was needed
    assert_eq!(runner.runs.borrow().len(), 2);
  }

  #[test]
  fn test_update_workflows_writes_only_changes() {
    let dir = TempDir::new().unwrap();
    let workflows = dir.path().join(".github/workflows");
    std::fs::create_dir_all(&workflows).unwrap();
    std::fs::write(workflows.join("a.yml"), WORKFLOW).unwrap();
    std::fs::write(workflows.join("b.yml"), "go-version: 1.22\n").unwrap();
    std::fs::write(workflows.join("c.yaml"), "go-version: 1.19\n").unwrap();

    assert_eq!(update_workflows(dir.path(), Some("1.22")).unwrap(), 1);
    assert!(
      std::fs::read_to_string(workflows.join("a.yml"))
        .unwrap()
        .ends_with("go-version: 1.22\n")
    );
    // only .yml files are considered
    assert_eq!(std::fs::read_to_string(workflows.join("c.yaml")).unwrap(), "go-version: 1.19\n");

    assert!(update_workflows(dir.path(), None).is_err());
    assert_eq!(update_workflows(&dir.path().join("missing"), None).unwrap(), 0);
  }

  #[test]
  fn test_version_source_embeds_fallback() {
    let src = version_source(&Version::new(1, 15, 4));
    assert!(src.contains("Major: 1,\n"));
    assert!(src.contains("Minor: 15,\n"));
    assert!(src.contains("Patch: 4,\n"));
    assert!(src.contains("{VersionStr: \"git\"},"));
    assert!(src.contains("Build: []string{\"HEAD\"},"));
    assert!(src.starts_with("package main\n"));
  }
}
