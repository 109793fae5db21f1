//! Downstream packaging targets
//!
//! A target is one package definition in a third-party repository. The
//! descriptor says where the working copy lives, which file to patch, which
//! upstream artifact it pins and where the pull request goes. Rules are
//! templates; they are rendered against a [`RenderContext`] once the
//! artifact checksums are known.

pub mod dispatcher;

pub use dispatcher::{DispatchReport, Dispatcher};

use crate::core::config::ProjectConfig;
use crate::core::error::{ConfigError, PostrelError, PostrelResult};
use crate::core::patch::PatchRuleSet;
use crate::core::version::Version;
use crate::utils::expand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which upstream artifact a target pins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
  /// Release tarball uploaded to the release page
  Release,
  /// Source archive generated from the tag
  #[default]
  Archive,
}

/// Where a target's pull request is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDest {
  pub org: String,
  pub repo: String,
  #[serde(default = "default_pr_base")]
  pub base: String,
}

fn default_pr_base() -> String {
  "master".to_string()
}

/// One prefix rule before placeholder expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTemplate {
  pub prefix: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub replace: Option<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub delete: bool,
}

impl RuleTemplate {
  pub fn replace(prefix: &str, with: &str) -> Self {
    Self {
      prefix: prefix.to_string(),
      replace: Some(with.to_string()),
      delete: false,
    }
  }

  pub fn delete(prefix: &str) -> Self {
    Self {
      prefix: prefix.to_string(),
      replace: None,
      delete: true,
    }
  }

  /// A rule must either replace or delete, never both or neither
  pub fn validate(&self, target: &str) -> PostrelResult<()> {
    if self.prefix.is_empty() {
      return Err(invalid(target, "rule prefix must not be empty"));
    }
    match (&self.replace, self.delete) {
      (Some(_), false) | (None, true) => Ok(()),
      (Some(_), true) => Err(invalid(
        target,
        &format!("rule '{}' sets both replace and delete", self.prefix),
      )),
      (None, false) => Err(invalid(
        target,
        &format!("rule '{}' needs replace or delete = true", self.prefix),
      )),
    }
  }

  /// Append this rule, rendered against `ctx`, to `set`
  fn render_into(&self, set: PatchRuleSet, ctx: &RenderContext) -> PatchRuleSet {
    let prefix = ctx.expand(&self.prefix);
    match &self.replace {
      Some(with) if !self.delete => set.replace(prefix, ctx.expand(with)),
      _ => set.delete(prefix),
    }
  }
}

fn invalid(target: &str, reason: &str) -> PostrelError {
  PostrelError::Config(ConfigError::Invalid {
    field: format!("targets.{}", target),
    reason: reason.to_string(),
  })
}

/// A downstream package definition to update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
  pub name: String,
  /// Working copy, relative to the project root unless absolute
  pub dir: PathBuf,
  /// Build-definition file relative to `dir`; may use placeholders
  pub build_file: String,
  #[serde(default)]
  pub artifact: ArtifactKind,
  /// Commit message template; the workflow default is used when unset
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pull_request: Option<PullRequestDest>,
  #[serde(default)]
  pub rules: Vec<RuleTemplate>,
}

impl TargetDescriptor {
  /// Working directory resolved against `root`
  pub fn work_dir(&self, root: &Path) -> PathBuf {
    root.join(&self.dir)
  }

  /// `<PROJECT>_<TARGET>_PKG_DIR`
  pub fn env_key(&self, project: &str) -> String {
    format!("{}_{}_PKG_DIR", env_prefix(project), env_prefix(&self.name))
  }

  pub fn build_file(&self, ctx: &RenderContext) -> PathBuf {
    PathBuf::from(ctx.expand(&self.build_file))
  }

  pub fn message(&self, ctx: &RenderContext) -> Option<String> {
    self.message.as_deref().map(|m| ctx.expand(m))
  }

  /// Render the rule templates into an ordered rule set
  pub fn rules(&self, ctx: &RenderContext) -> PostrelResult<PatchRuleSet> {
    let mut set = PatchRuleSet::new();
    for rule in &self.rules {
      rule.validate(&self.name)?;
      set = rule.render_into(set, ctx);
    }
    Ok(set)
  }

  pub fn validate(&self) -> PostrelResult<()> {
    if self.name.trim().is_empty() {
      return Err(PostrelError::Config(ConfigError::Invalid {
        field: "targets.name".to_string(),
        reason: "must not be empty".to_string(),
      }));
    }
    if self.build_file.trim().is_empty() {
      return Err(invalid(&self.name, "build_file must not be empty"));
    }
    if self.rules.is_empty() {
      return Err(invalid(&self.name, "at least one rule is required"));
    }
    for rule in &self.rules {
      rule.validate(&self.name)?;
    }
    if let Some(pr) = &self.pull_request
      && (pr.org.is_empty() || pr.repo.is_empty())
    {
      return Err(invalid(&self.name, "pull_request needs org and repo"));
    }
    Ok(())
  }
}

/// Upper-cased env var prefix: `gopass-hibp` -> `GOPASS_HIBP`
pub fn env_prefix(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect()
}

/// Placeholder values for one target
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
  pub name: String,
  pub org: String,
  pub repo: String,
  pub version: String,
  pub url: String,
  pub sha256: String,
  pub sha512: String,
}

impl RenderContext {
  /// Context before checksums are known; enough to render artifact URLs
  pub fn for_project(project: &ProjectConfig, version: &Version) -> Self {
    Self {
      name: project.name.clone(),
      org: project.org.clone(),
      repo: project.repo.clone(),
      version: version.to_string(),
      ..Default::default()
    }
  }

  pub fn expand(&self, template: &str) -> String {
    expand(
      template,
      &[
        ("name", self.name.as_str()),
        ("org", self.org.as_str()),
        ("repo", self.repo.as_str()),
        ("version", self.version.as_str()),
        ("url", self.url.as_str()),
        ("sha256", self.sha256.as_str()),
        ("sha512", self.sha512.as_str()),
      ],
    )
  }
}

/// Artifact URL for `kind`, rendered from the project's URL templates
pub fn artifact_url(project: &ProjectConfig, version: &Version, kind: ArtifactKind) -> String {
  let ctx = RenderContext::for_project(project, version);
  match kind {
    ArtifactKind::Release => ctx.expand(&project.release_url),
    ArtifactKind::Archive => ctx.expand(&project.archive_url),
  }
}

/// Targets updated when the configuration names none
pub fn builtin_targets() -> Vec<TargetDescriptor> {
  vec![
    TargetDescriptor {
      name: "alpine".to_string(),
      dir: PathBuf::from("../repos/alpine/"),
      build_file: "community/{name}/APKBUILD".to_string(),
      artifact: ArtifactKind::Archive,
      message: Some("community/{name}: upgrade to {version}".to_string()),
      pull_request: None,
      rules: vec![
        RuleTemplate::replace("pkgver=", "pkgver={version}"),
        RuleTemplate::replace("sha512sums=", "sha512sums=\"{sha512}  {name}-{version}.tar.gz\""),
        RuleTemplate::replace(
          "source=",
          "source=\"$pkgname-$pkgver.tar.gz::https://github.com/{org}/{repo}/archive/v$pkgver.tar.gz\"",
        ),
      ],
    },
    TargetDescriptor {
      name: "homebrew".to_string(),
      dir: PathBuf::from("../repos/homebrew/"),
      build_file: "Formula/{name}.rb".to_string(),
      artifact: ArtifactKind::Release,
      message: None,
      pull_request: Some(PullRequestDest {
        org: "Homebrew".to_string(),
        repo: "homebrew-core".to_string(),
        base: default_pr_base(),
      }),
      rules: vec![
        RuleTemplate::replace("  url \"https://github.com/", "  url \"{url}\""),
        RuleTemplate::replace("  sha256 \"", "  sha256 \"{sha256}\""),
      ],
    },
    TargetDescriptor {
      name: "void".to_string(),
      dir: PathBuf::from("../repos/void/"),
      build_file: "srcpkgs/{name}/template".to_string(),
      artifact: ArtifactKind::Archive,
      message: None,
      pull_request: Some(PullRequestDest {
        org: "void-linux".to_string(),
        repo: "void-packages".to_string(),
        base: default_pr_base(),
      }),
      rules: vec![
        RuleTemplate::replace("version=", "version={version}"),
        RuleTemplate::replace("checksum=", "checksum={sha256}"),
        RuleTemplate::replace(
          "distfiles=",
          "distfiles=\"https://github.com/{org}/{repo}/archive/v${{version}}.tar.gz\"",
        ),
      ],
    },
  ]
}
