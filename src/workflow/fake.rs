//! In-memory repository for workflow and dispatcher tests
//!
//! Records every call as a short string, holds files in a real directory so
//! patching works, and fails any operation named in `failing`.

use crate::core::error::{GitError, PostrelError, PostrelResult};
use crate::core::vcs::RepositoryBackend;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

pub(crate) struct FakeRepo {
  dir: PathBuf,
  _tmp: Option<TempDir>,
  log: CallLog,
  branches: RefCell<Vec<String>>,
  tags: RefCell<Vec<String>>,
  dirty: bool,
  status_unavailable: bool,
  failing: Vec<&'static str>,
}

impl FakeRepo {
  /// Fresh repository in its own temp dir holding `files`
  pub fn new(files: &[(&str, &str)]) -> Self {
    let tmp = TempDir::new().unwrap();
    let mut repo = Self::at(tmp.path(), Rc::default());
    repo._tmp = Some(tmp);
    repo.write_files(files);
    repo
  }

  /// Repository rooted at an existing directory, logging into `log`
  pub fn at(dir: &Path, log: CallLog) -> Self {
    Self {
      dir: dir.to_path_buf(),
      _tmp: None,
      log,
      branches: RefCell::new(vec!["master".to_string()]),
      tags: RefCell::default(),
      dirty: false,
      status_unavailable: false,
      failing: Vec::new(),
    }
  }

  pub fn write_files(&self, files: &[(&str, &str)]) {
    for (name, content) in files {
      let path = self.dir.join(name);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
      }
      std::fs::write(path, content).unwrap();
    }
  }

  pub fn dirty(mut self) -> Self {
    self.dirty = true;
    self
  }

  pub fn status_unavailable(mut self) -> Self {
    self.status_unavailable = true;
    self
  }

  pub fn failing(mut self, op: &'static str) -> Self {
    self.failing.push(op);
    self
  }

  pub fn with_branch(self, name: &str) -> Self {
    self.branches.borrow_mut().push(name.to_string());
    self
  }

  pub fn with_tag(self, tag: &str) -> Self {
    self.tags.borrow_mut().push(tag.to_string());
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.log.borrow().clone()
  }

  pub fn branch_count(&self, name: &str) -> usize {
    self.branches.borrow().iter().filter(|b| *b == name).count()
  }

  pub fn read(&self, name: &str) -> String {
    std::fs::read_to_string(self.dir.join(name)).unwrap()
  }

  fn record(&self, op: &'static str, detail: String) -> PostrelResult<()> {
    let entry = if detail.is_empty() {
      op.to_string()
    } else {
      format!("{} {}", op, detail)
    };
    self.log.borrow_mut().push(entry);

    if self.failing.contains(&op) {
      return Err(PostrelError::Git(GitError::CommandFailed {
        command: format!("git {}", op),
        stderr: "injected failure".to_string(),
      }));
    }
    Ok(())
  }
}

impl RepositoryBackend for FakeRepo {
  fn work_dir(&self) -> &Path {
    &self.dir
  }

  fn is_clean(&self) -> PostrelResult<bool> {
    self.record("is_clean", String::new())?;
    if self.status_unavailable {
      return Err(PostrelError::Git(GitError::StatusUnavailable {
        path: self.dir.clone(),
        reason: "git not found".to_string(),
      }));
    }
    Ok(!self.dirty)
  }

  fn checkout(&self, branch: &str) -> PostrelResult<()> {
    self.record("checkout", branch.to_string())
  }

  fn pull(&self, remote: &str, branch: &str) -> PostrelResult<()> {
    self.record("pull", format!("{} {}", remote, branch))
  }

  fn create_branch(&self, name: &str) -> PostrelResult<()> {
    self.record("create_branch", name.to_string())?;
    if self.branch_count(name) > 0 {
      return Err(PostrelError::Git(GitError::BranchError {
        message: format!("a branch named '{}' already exists", name),
      }));
    }
    self.branches.borrow_mut().push(name.to_string());
    Ok(())
  }

  fn delete_branch(&self, name: &str) -> PostrelResult<()> {
    self.record("delete_branch", name.to_string())?;
    self.branches.borrow_mut().retain(|b| b != name);
    Ok(())
  }

  fn stage_and_commit(&self, paths: &[PathBuf], _message: &str) -> PostrelResult<()> {
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    self.record("commit", names.join(" "))
  }

  fn commit_tracked(&self, _message: &str) -> PostrelResult<()> {
    self.record("commit_tracked", String::new())
  }

  fn push(&self, remote: &str, branch: &str) -> PostrelResult<()> {
    self.record("push", format!("{} {}", remote, branch))
  }

  fn tag_and_push(&self, remote: &str, tag: &str, _message: &str) -> PostrelResult<()> {
    self.record("tag_and_push", format!("{} {}", remote, tag))?;
    self.tags.borrow_mut().push(tag.to_string());
    Ok(())
  }

  fn has_tag(&self, tag: &str) -> bool {
    self.tags.borrow().iter().any(|t| t == tag)
  }
}
