//! Tests for the full run preconditions

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_missing_credentials_exit_before_mutation() -> Result<()> {
  let project = TestProject::new("1.15.4")?;
  project.init_website("{{ .Version }}")?;

  let output = run_postrel(&project.path, &["--yes"])?;
  assert_eq!(output.status.code(), Some(1));

  let err = stderr(&output);
  assert!(err.contains("GITHUB_TOKEN"));
  assert!(err.contains("GITHUB_USER"));
  assert!(err.contains("GITHUB_FORK"));

  assert!(!project.website_file("index.html").exists());
  assert_eq!(project.commit_count()?, 1);
  Ok(())
}

#[test]
fn test_bad_version_file_exits_with_user_error() -> Result<()> {
  let project = TestProject::new("not-a-version")?;

  let output = run_postrel(&project.path, &["render"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Failed to read version"));
  Ok(())
}

#[test]
fn test_invalid_config_exits_with_validation_error() -> Result<()> {
  let project = TestProject::new("1.0.0")?;
  std::fs::write(
    project.path.join("postrel.toml"),
    r#"[project]
name = ""
"#,
  )?;

  let output = run_postrel(&project.path, &["render"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}
