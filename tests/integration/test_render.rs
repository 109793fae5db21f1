//! Tests for `postrel render`

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_render_without_credentials() -> Result<()> {
  let project = TestProject::new("v1.15.4")?;
  project.init_website("<h1>gopass {{ .Version }}</h1>\n")?;

  let output = run_postrel(&project.path, &["render"])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert!(stdout(&output).contains("Done (render website only)"));

  let html = std::fs::read_to_string(project.website_file("index.html"))?;
  assert_eq!(html, "<h1>gopass 1.15.4</h1>\n");
  Ok(())
}

#[test]
fn test_render_makes_no_commits() -> Result<()> {
  let project = TestProject::new("1.15.4")?;
  project.init_website("{{.Version}}")?;
  let before = project.commit_count()?;

  let output = run_postrel(&project.path, &["render"])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  assert_eq!(project.commit_count()?, before);
  let status = git(&project.website, &["status", "--porcelain"])?;
  assert!(String::from_utf8_lossy(&status.stdout).contains("index.html"));
  Ok(())
}

#[test]
fn test_render_failure_is_reported_not_fatal() -> Result<()> {
  let project = TestProject::new("1.15.4")?;

  // No index.tpl in the website directory
  let output = run_postrel(&project.path, &["render"])?;
  assert!(output.status.success());
  assert!(stderr(&output).contains("Failed to update website"));
  assert!(stdout(&output).contains("Done (render website only)"));
  assert!(!project.website_file("index.html").exists());
  Ok(())
}

#[test]
fn test_render_honors_htmldir_env() -> Result<()> {
  let project = TestProject::new("2.0.0")?;
  let other = tempfile::TempDir::new()?;
  std::fs::write(other.path().join("index.tpl"), "v{{ .Version }}")?;

  let output = std::process::Command::new(env!("CARGO_BIN_EXE_postrel"))
    .arg("-C")
    .arg(&project.path)
    .arg("render")
    .env("GOPASS_HTMLDIR", other.path())
    .output()?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  assert_eq!(std::fs::read_to_string(other.path().join("index.html"))?, "v2.0.0");
  assert!(!project.website_file("index.html").exists());
  Ok(())
}
