//! Release version value type
//!
//! Wraps [`semver::Version`] so that every branch name, tag and commit
//! message is produced from one canonical rendering. Input may carry a
//! leading `v` and surrounding whitespace; output never does.

use crate::core::error::{ConfigError, PostrelError, PostrelResult};
use semver::{BuildMetadata, Prerelease};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A released (or about to be released) version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(semver::Version);

impl Version {
  pub fn new(major: u64, minor: u64, patch: u64) -> Self {
    Self(semver::Version::new(major, minor, patch))
  }

  /// Parse a version string, accepting a leading `v`
  pub fn parse(input: &str) -> Result<Self, semver::Error> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(trimmed).map(Self)
  }

  /// Read the version marker file (a single semver line)
  pub fn read_file(path: &Path) -> PostrelResult<Self> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::VersionFile {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    Self::parse(&content).map_err(|e| {
      PostrelError::Config(ConfigError::VersionFile {
        path: path.to_path_buf(),
        reason: format!("{:?} is not a semantic version: {}", content.trim(), e),
      })
    })
  }

  pub fn major(&self) -> u64 {
    self.0.major
  }

  pub fn minor(&self) -> u64 {
    self.0.minor
  }

  pub fn patch(&self) -> u64 {
    self.0.patch
  }

  pub fn pre(&self) -> &str {
    self.0.pre.as_str()
  }

  pub fn build(&self) -> &str {
    self.0.build.as_str()
  }

  /// Next patch release; drops pre-release and build metadata
  pub fn next_patch(&self) -> PostrelResult<Self> {
    let patch = bump(self.0.patch, "patch", self)?;
    Ok(Self::new(self.0.major, self.0.minor, patch))
  }

  /// Next minor release (`X.(Y+1).0`)
  pub fn next_minor(&self) -> PostrelResult<Self> {
    let minor = bump(self.0.minor, "minor", self)?;
    Ok(Self::new(self.0.major, minor, 0))
  }

  /// Development build of this version: `X.Y.Z-git+HEAD`
  ///
  /// Used when a binary is built from a checkout instead of a tagged release.
  pub fn development(&self) -> Self {
    let mut v = semver::Version::new(self.0.major, self.0.minor, self.0.patch);
    v.pre = Prerelease::new("git").unwrap_or(Prerelease::EMPTY);
    v.build = BuildMetadata::new("HEAD").unwrap_or(BuildMetadata::EMPTY);
    Self(v)
  }

  /// Git tag for this version (`v1.2.3`)
  pub fn tag(&self) -> String {
    format!("v{}", self)
  }
}

fn bump(component: u64, name: &str, version: &Version) -> PostrelResult<u64> {
  component.checked_add(1).ok_or_else(|| {
    PostrelError::Config(ConfigError::Invalid {
      field: "version".to_string(),
      reason: format!("{} component of {} cannot be incremented", name, version),
    })
  })
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for Version {
  type Err = semver::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    for input in ["0.0.0", "1.2.3", "10.20.30", "1.15.13"] {
      assert_eq!(Version::parse(input).unwrap().to_string(), input);
    }
  }

  #[test]
  fn test_leading_v_and_whitespace_collapse() {
    let a = Version::parse("v1.2.3\n").unwrap();
    let b = Version::parse("1.2.3").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "1.2.3");
    assert_eq!(a.tag(), "v1.2.3");
  }

  #[test]
  fn test_ordering() {
    let pre = Version::parse("1.2.3-rc.1").unwrap();
    let rel = Version::parse("1.2.3").unwrap();
    assert!(pre < rel);
    assert!(Version::new(1, 2, 3) < Version::new(1, 3, 0));
    assert!(Version::new(1, 9, 9) < Version::new(2, 0, 0));
  }

  #[test]
  fn test_increments() {
    let v = Version::parse("1.2.3").unwrap();
    assert_eq!(v.next_patch().unwrap().to_string(), "1.2.4");
    assert_eq!(v.next_patch().unwrap().next_patch().unwrap().to_string(), "1.2.5");
    assert_eq!(v.next_minor().unwrap().to_string(), "1.3.0");
  }

  #[test]
  fn test_increment_overflow_is_an_error() {
    let v = Version::parse(&format!("1.{}.{}", u64::MAX, u64::MAX)).unwrap();
    let err = v.next_patch().unwrap_err();
    assert!(err.to_string().contains("patch component"));
    assert!(v.next_minor().is_err());

    // patch overflow does not matter for the next minor
    let v = Version::new(1, 2, u64::MAX);
    assert_eq!(v.next_minor().unwrap(), Version::new(1, 3, 0));
  }

  #[test]
  fn test_development_fallback() {
    let v = Version::new(1, 15, 2).development();
    assert_eq!(v.to_string(), "1.15.2-git+HEAD");
    assert!(!v.pre().is_empty());
    assert!(v < Version::new(1, 15, 2));
  }

  #[test]
  fn test_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("VERSION");
    std::fs::write(&path, "1.2.3\n").unwrap();
    assert_eq!(Version::read_file(&path).unwrap(), Version::new(1, 2, 3));

    std::fs::write(&path, "not-a-version\n").unwrap();
    let err = Version::read_file(&path).unwrap_err();
    assert!(err.is_fatal());

    let missing = Version::read_file(&dir.path().join("MISSING")).unwrap_err();
    assert!(missing.is_fatal());
  }
}
