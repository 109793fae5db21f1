//! Changelog entries for integration releases

use crate::core::error::PostrelResult;
use crate::core::patch::write_atomic;
use crate::core::version::Version;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Entry recording a dependency bump to `upstream` at `version`
pub fn release_entry(version: &Version, upstream: &str) -> String {
  format!(
    "## {version}\n\n- Bump dependencies to {upstream} release v{version}\n\n",
    version = version,
    upstream = upstream
  )
}

/// Prepend the entry for `version` to the changelog at `path`
///
/// A missing changelog is created. Newest entries stay on top.
pub fn prepend_entry(path: &Path, version: &Version, upstream: &str) -> PostrelResult<()> {
  let existing = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
    Err(e) => return Err(e.into()),
  };

  let mut contents = release_entry(version, upstream).into_bytes();
  contents.extend_from_slice(&existing);
  write_atomic(path, &contents)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_prepend_keeps_history_below() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CHANGELOG.md");
    fs::write(&path, "## 1.2.3\n\n- Older entry\n").unwrap();

    prepend_entry(&path, &Version::new(1, 2, 4), "gopass").unwrap();
    assert_eq!(
      fs::read_to_string(&path).unwrap(),
      "## 1.2.4\n\n- Bump dependencies to gopass release v1.2.4\n\n## 1.2.3\n\n- Older entry\n"
    );
  }

  #[test]
  fn test_missing_changelog_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CHANGELOG.md");
    prepend_entry(&path, &Version::new(2, 0, 0), "gopass").unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("## 2.0.0\n"));
  }
}
