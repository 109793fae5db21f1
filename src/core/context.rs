//! Release context - load once, pass everywhere
//!
//! ```text
//! main.rs:
//!   ReleaseContext::load(root) -> &ReleaseContext
//!   |
//!   v
//! commands/render.rs, release.rs:
//!   fn run(ctx: &ReleaseContext)
//! ```
//!
//! Loading reads the config (defaults when absent), applies environment
//! overrides and parses the version marker file. A bad version file is the
//! only failure; it aborts the run before anything is touched.

use crate::core::config::PostrelConfig;
use crate::core::error::PostrelResult;
use crate::core::version::Version;
use std::path::{Path, PathBuf};

pub struct ReleaseContext {
  /// Project root every relative path is resolved against
  pub root: PathBuf,
  pub config: PostrelConfig,
  /// The version that was just released
  pub version: Version,
}

impl ReleaseContext {
  /// Load with overrides from the process environment
  pub fn load(root: &Path) -> PostrelResult<Self> {
    Self::load_with_env(root, |key| std::env::var(key).ok())
  }

  pub fn load_with_env<F>(root: &Path, lookup: F) -> PostrelResult<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = PostrelConfig::load(root)?;
    config.apply_env(lookup);
    let version = Version::read_file(&config.version_path(root))?;

    Ok(Self {
      root: root.to_path_buf(),
      config,
      version,
    })
  }

  /// First version the new milestones are planned from
  pub fn next_version(&self) -> PostrelResult<Version> {
    self.version.next_patch()
  }

  pub fn website_dir(&self) -> PathBuf {
    self.config.website_dir(&self.root)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::{ConfigError, PostrelError};

  #[test]
  fn test_load_reads_version_and_env() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("VERSION"), "v1.15.4\n").unwrap();

    let ctx = ReleaseContext::load_with_env(dir.path(), |key| {
      (key == "GOPASS_HTMLDIR").then(|| "/srv/www".to_string())
    })
    .unwrap();

    assert_eq!(ctx.version.to_string(), "1.15.4");
    assert_eq!(ctx.next_version().unwrap().to_string(), "1.15.5");
    assert_eq!(ctx.website_dir(), PathBuf::from("/srv/www"));
  }

  #[test]
  fn test_bad_version_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("VERSION"), "not-a-version\n").unwrap();

    let err = ReleaseContext::load_with_env(dir.path(), |_| None).err().unwrap();
    assert!(matches!(err, PostrelError::Config(ConfigError::VersionFile { .. })));
    assert!(err.is_fatal());

    let empty = tempfile::tempdir().unwrap();
    assert!(ReleaseContext::load_with_env(empty.path(), |_| None).is_err());
  }
}
