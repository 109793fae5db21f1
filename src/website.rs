//! Project website: render the landing page for the new version

use crate::core::error::{PostrelError, PostrelResult, ResultExt};
use crate::core::patch::write_atomic;
use crate::core::vcs::RepositoryBackend;
use crate::core::version::Version;
use crate::workflow::Step;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `{{ .Version }}` with any inner spacing
const VERSION_PLACEHOLDER: &str = r"\{\{\s*\.Version\s*\}\}";

/// Replace every version placeholder in `template`
pub fn render_str(template: &str, version: &Version) -> PostrelResult<String> {
  let re = Regex::new(VERSION_PLACEHOLDER)?;
  let version = version.to_string();
  Ok(re.replace_all(template, regex::NoExpand(&version)).into_owned())
}

/// Render `dir/template` into `dir/output`; returns the output path
pub fn render(dir: &Path, template: &str, output: &str, version: &Version) -> PostrelResult<PathBuf> {
  render_file(dir, template, output, version).map_err(|e| PostrelError::at_step(Step::Render, e))
}

fn render_file(dir: &Path, template: &str, output: &str, version: &Version) -> PostrelResult<PathBuf> {
  let template_path = dir.join(template);
  let source = fs::read_to_string(&template_path)
    .with_context(|| format!("Failed to read website template {}", template_path.display()))?;

  let rendered = render_str(&source, version)?;
  if rendered.contains("{{") {
    debug!(template = %template_path.display(), "template has actions besides the version placeholder");
  }

  let output_path = dir.join(output);
  write_atomic(&output_path, rendered.as_bytes())?;
  Ok(output_path)
}

/// Commit the rendered page and push the base branch upstream
pub fn publish<B: RepositoryBackend>(repo: &B, output: &str, version: &Version, base: &str) -> PostrelResult<()> {
  repo
    .stage_and_commit(&[PathBuf::from(output)], &format!("Update to {}", version.tag()))
    .map_err(|e| PostrelError::at_step(Step::Commit, e))?;
  repo
    .push("origin", base)
    .map_err(|e| PostrelError::at_step(Step::Push, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::SystemGit;
  use crate::core::vcs::fixture::{GitFixture, git};

  #[test]
  fn test_render_str_variants() {
    let v = Version::new(1, 15, 4);
    assert_eq!(
      render_str("<b>{{ .Version }}</b> {{.Version}} {{  .Version  }}", &v).unwrap(),
      "<b>1.15.4</b> 1.15.4 1.15.4"
    );
    assert_eq!(render_str("{{ .Other }}", &v).unwrap(), "{{ .Other }}");
  }

  #[test]
  fn test_render_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.tpl"), "Latest: v{{ .Version }}\n").unwrap();

    let out = render(dir.path(), "index.tpl", "index.html", &Version::new(1, 2, 3)).unwrap();
    assert_eq!(out, dir.path().join("index.html"));
    assert_eq!(fs::read_to_string(out).unwrap(), "Latest: v1.2.3\n");
  }

  #[test]
  fn test_render_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let err = render(dir.path(), "index.tpl", "index.html", &Version::new(1, 2, 3)).unwrap_err();
    assert_eq!(err.step(), Some(Step::Render));
    assert!(err.to_string().contains("Failed to read website template"));
    assert!(!dir.path().join("index.html").exists());
  }

  #[test]
  fn test_publish_commits_and_pushes() {
    let fx = GitFixture::new(&[("index.tpl", "v{{ .Version }}\n"), ("index.html", "v1.2.2\n")]);
    let version = Version::new(1, 2, 3);
    render(&fx.work, "index.tpl", "index.html", &version).unwrap();

    let repo = SystemGit::open(&fx.work).unwrap();
    publish(&repo, "index.html", &version, "master").unwrap();

    let pushed = git(&fx.origin, &["show", "master:index.html"]);
    assert_eq!(pushed, "v1.2.3\n");
    let subject = git(&fx.origin, &["log", "-1", "--format=%s", "master"]);
    assert_eq!(subject.trim(), "Update to v1.2.3");
  }
}
