//! Prefix-rule text patching with atomic replacement
//!
//! Build-definition files (APKBUILD, Homebrew formulae, void templates) are
//! treated as opaque text. Each line is tested against an ordered rule set;
//! the first rule whose prefix matches decides whether the line is replaced
//! or dropped, and every other line is copied through byte-for-byte,
//! including its line terminator.
//!
//! Output always goes to a temporary sibling of the target and is renamed
//! over it only after the whole file was written, so a reader never sees a
//! half-patched file.

use crate::core::error::{PatchError, PostrelResult};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// What to do with a line that matches a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchAction {
  /// Emit this literal instead of the line
  Replace(String),
  /// Emit nothing
  Delete,
}

/// A single prefix rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRule {
  pub prefix: String,
  pub action: PatchAction,
}

/// Ordered prefix rules; the first match wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchRuleSet {
  rules: Vec<PatchRule>,
}

impl PatchRuleSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a replace rule (builder style)
  pub fn replace(mut self, prefix: impl Into<String>, with: impl Into<String>) -> Self {
    self.push(prefix, PatchAction::Replace(with.into()));
    self
  }

  /// Add a delete rule (builder style)
  pub fn delete(mut self, prefix: impl Into<String>) -> Self {
    self.push(prefix, PatchAction::Delete);
    self
  }

  fn push(&mut self, prefix: impl Into<String>, action: PatchAction) {
    self.rules.push(PatchRule {
      prefix: prefix.into(),
      action,
    });
  }

  /// First rule whose prefix matches `line`
  pub fn find(&self, line: &[u8]) -> Option<&PatchRule> {
    self.rules.iter().find(|r| line.starts_with(r.prefix.as_bytes()))
  }

}

/// Line counts from one patch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
  pub replaced: usize,
  pub deleted: usize,
  pub unchanged: usize,
  /// Matched lines whose bytes actually changed
  pub rewritten: usize,
}

impl PatchReport {
  /// True if the output differs from the input
  pub fn changed(&self) -> bool {
    self.rewritten > 0
  }
}

/// Split a raw line into content and terminator (`\r\n`, `\n` or nothing)
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
  if let Some(content) = line.strip_suffix(b"\r\n") {
    (content, &line[content.len()..])
  } else if let Some(content) = line.strip_suffix(b"\n") {
    (content, &line[content.len()..])
  } else {
    (line, &line[line.len()..])
  }
}

/// Stream `input` to `output`, applying `rules` to every line
pub fn patch_lines<R: BufRead, W: Write>(
  mut input: R,
  mut output: W,
  rules: &PatchRuleSet,
) -> io::Result<PatchReport> {
  let mut report = PatchReport::default();
  let mut line = Vec::new();

  loop {
    line.clear();
    if input.read_until(b'\n', &mut line)? == 0 {
      break;
    }

    let (content, terminator) = split_terminator(&line);
    match rules.find(content).map(|r| &r.action) {
      Some(PatchAction::Replace(with)) => {
        output.write_all(with.as_bytes())?;
        output.write_all(terminator)?;
        report.replaced += 1;
        if with.as_bytes() != content {
          report.rewritten += 1;
        }
      }
      Some(PatchAction::Delete) => {
        report.deleted += 1;
        report.rewritten += 1;
      }
      None => {
        output.write_all(&line)?;
        report.unchanged += 1;
      }
    }
  }

  output.flush()?;
  Ok(report)
}

/// A fully written temporary sibling waiting to replace its target
///
/// Dropping it without [`StagedFile::commit`] removes the temporary file and
/// leaves the target untouched.
pub struct StagedFile {
  target: PathBuf,
  temp: NamedTempFile,
}

impl StagedFile {
  /// Create an empty temporary sibling of `target`
  pub fn create(target: &Path) -> Result<Self, PatchError> {
    let dir = target
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| Path::new("."));
    let name = target
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "patch".to_string());

    let temp = tempfile::Builder::new()
      .prefix(&format!(".{}.", name))
      .suffix(".new")
      .tempfile_in(dir)
      .map_err(|e| PatchError::Write {
        path: target.to_path_buf(),
        source: e,
      })?;

    Ok(Self {
      target: target.to_path_buf(),
      temp,
    })
  }

  /// Path of the temporary file
  #[cfg(test)]
  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  fn write_err(&self, source: io::Error) -> PatchError {
    PatchError::Write {
      path: self.target.clone(),
      source,
    }
  }

  /// Flush, carry over permissions and atomically rename onto the target
  pub fn commit(self) -> Result<(), PatchError> {
    self.temp.as_file().sync_all().map_err(|e| self.write_err(e))?;

    let permissions = match fs::metadata(&self.target) {
      Ok(meta) => Some(meta.permissions()),
      Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
      fs::set_permissions(self.temp.path(), permissions).map_err(|e| self.write_err(e))?;
    }

    let target = self.target;
    self.temp.persist(&target).map_err(|e| PatchError::Rename {
      path: target.clone(),
      source: e.error,
    })?;
    Ok(())
  }
}

impl Write for StagedFile {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.temp.write(buf)
  }

  fn flush(&mut self) -> io::Result<()> {
    self.temp.flush()
  }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
  use std::os::unix::fs::PermissionsExt;
  Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
  None
}

/// Patch `path` into a staged sibling without touching the original yet
pub fn stage_patch(path: &Path, rules: &PatchRuleSet) -> Result<(StagedFile, PatchReport), PatchError> {
  let input = File::open(path).map_err(|e| PatchError::Read {
    path: path.to_path_buf(),
    source: e,
  })?;

  let mut staged = StagedFile::create(path)?;
  let report = patch_lines(BufReader::new(input), &mut staged, rules).map_err(|e| PatchError::Read {
    path: path.to_path_buf(),
    source: e,
  })?;

  Ok((staged, report))
}

/// Rewrite `path` in place by applying `rules`
///
/// A run where no rule matched still succeeds and leaves the content as it
/// was.
pub fn apply_rules(path: &Path, rules: &PatchRuleSet) -> PostrelResult<PatchReport> {
  let (staged, report) = stage_patch(path, rules)?;
  staged.commit()?;

  debug!(
    path = %path.display(),
    replaced = report.replaced,
    deleted = report.deleted,
    "patched file"
  );
  Ok(report)
}

/// Replace the content of `path` atomically
pub fn write_atomic(path: &Path, contents: &[u8]) -> PostrelResult<()> {
  let mut staged = StagedFile::create(path)?;
  staged.write_all(contents).map_err(|e| PatchError::Write {
    path: path.to_path_buf(),
    source: e,
  })?;
  staged.commit()?;
  Ok(())
}
