use crate::core::error::{ConfigError, PostrelError, PostrelResult, ResultExt};
use crate::targets::{TargetDescriptor, builtin_targets, env_prefix};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for postrel
/// Searched in order: postrel.toml, .postrel.toml, .config/postrel.toml
///
/// Every field has a default; no file at all means built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostrelConfig {
  pub project: ProjectConfig,
  pub website: WebsiteConfig,
  pub github: GitHubConfig,
  pub integration: IntegrationConfig,
  pub targets: Vec<TargetDescriptor>,
}

impl Default for PostrelConfig {
  fn default() -> Self {
    Self {
      project: ProjectConfig::default(),
      website: WebsiteConfig::default(),
      github: GitHubConfig::default(),
      integration: IntegrationConfig::default(),
      targets: builtin_targets(),
    }
  }
}

/// The released project itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  /// Branch prefix, env var prefix and artifact base name
  pub name: String,
  pub org: String,
  pub repo: String,
  /// Base branch of every repository touched by a run
  pub base_branch: String,
  /// Version marker file, relative to the project root
  pub version_file: PathBuf,
  /// Release tarball URL template
  pub release_url: String,
  /// Source archive URL template
  pub archive_url: String,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      name: "gopass".to_string(),
      org: "gopasspw".to_string(),
      repo: "gopass".to_string(),
      base_branch: "master".to_string(),
      version_file: PathBuf::from("VERSION"),
      release_url: "https://github.com/{org}/{repo}/releases/download/v{version}/{name}-{version}.tar.gz".to_string(),
      archive_url: "https://github.com/{org}/{repo}/archive/v{version}.tar.gz".to_string(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteConfig {
  /// Website checkout, relative to the project root unless absolute
  pub dir: PathBuf,
  pub template: String,
  pub output: String,
}

impl Default for WebsiteConfig {
  fn default() -> Self {
    Self {
      dir: PathBuf::from("../gopasspw.github.io"),
      template: "index.tpl".to_string(),
      output: "index.html".to_string(),
    }
  }
}

/// GitHub identity; the environment always wins over the file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
  pub user: String,
  /// Remote name of the fork release branches are pushed to
  pub fork: String,
  /// Only ever read from GITHUB_TOKEN
  #[serde(skip)]
  pub token: String,
}

/// Companion repositories bumped to the new release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
  pub names: Vec<String>,
  /// Directory holding the integration checkouts (default: parent of the root)
  pub dir: Option<PathBuf>,
  /// argv lists run in each checkout, with `{tag}` `{version}` `{toolchain}` `{org}` `{repo}`
  pub commands: Vec<Vec<String>>,
  /// Files copied from the project root into each checkout
  pub sync_files: Vec<String>,
  pub version_source: String,
  pub changelog: String,
  /// Toolchain version; detected from `go env GOVERSION` when unset
  pub toolchain: Option<String>,
}

impl Default for IntegrationConfig {
  fn default() -> Self {
    let argv = |args: &[&str]| args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
    Self {
      names: ["git-credential-gopass", "gopass-hibp", "gopass-jsonapi", "gopass-summon-provider"]
        .iter()
        .map(|n| n.to_string())
        .collect(),
      dir: None,
      commands: vec![
        argv(&["make", "upgrade"]),
        argv(&["go", "get", "github.com/{org}/{repo}@{tag}"]),
        argv(&["go", "mod", "edit", "-go={toolchain}"]),
      ],
      sync_files: vec![".golangci.yml".to_string()],
      version_source: "version.go".to_string(),
      changelog: "CHANGELOG.md".to_string(),
      toolchain: None,
    }
  }
}

/// Everything a full run needs from GITHUB_*
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub token: String,
  pub user: String,
  pub fork: String,
}

impl PostrelConfig {
  /// Find config file in search order: postrel.toml, .postrel.toml, .config/postrel.toml
  pub fn find_config_path(root: &Path) -> Option<PathBuf> {
    let candidates = [
      root.join("postrel.toml"),
      root.join(".postrel.toml"),
      root.join(".config").join("postrel.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load and validate the config under `root`, falling back to defaults
  pub fn load(root: &Path) -> PostrelResult<Self> {
    let Some(config_path) = Self::find_config_path(root) else {
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: PostrelConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  /// Apply environment overrides; empty values are ignored
  pub fn apply_env<F>(&mut self, lookup: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let prefix = env_prefix(&self.project.name);

    if let Some(dir) = get(&format!("{}_HTMLDIR", prefix)) {
      self.website.dir = PathBuf::from(dir);
    }

    for target in &mut self.targets {
      if let Some(dir) = get(&target.env_key(&self.project.name)) {
        target.dir = PathBuf::from(dir);
      }
    }

    if let Some(token) = get("GITHUB_TOKEN") {
      self.github.token = token;
    }
    if let Some(user) = get("GITHUB_USER") {
      self.github.user = user;
    }
    if let Some(fork) = get("GITHUB_FORK") {
      self.github.fork = fork;
    }
  }

  /// Credentials for a full run; names every missing variable at once
  pub fn credentials(&self) -> PostrelResult<Credentials> {
    let missing: Vec<String> = [
      ("GITHUB_TOKEN", &self.github.token),
      ("GITHUB_USER", &self.github.user),
      ("GITHUB_FORK", &self.github.fork),
    ]
    .iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(key, _)| key.to_string())
    .collect();

    if !missing.is_empty() {
      return Err(PostrelError::Config(ConfigError::MissingCredentials { missing }));
    }

    Ok(Credentials {
      token: self.github.token.clone(),
      user: self.github.user.clone(),
      fork: self.github.fork.clone(),
    })
  }

  pub fn website_dir(&self, root: &Path) -> PathBuf {
    root.join(&self.website.dir)
  }

  pub fn version_path(&self, root: &Path) -> PathBuf {
    root.join(&self.project.version_file)
  }

  /// Directory holding the integration checkouts
  pub fn integration_dir(&self, root: &Path) -> PathBuf {
    match &self.integration.dir {
      Some(dir) => root.join(dir),
      None => root.join(".."),
    }
  }

  pub fn validate(&self) -> PostrelResult<()> {
    for (field, value) in [
      ("project.name", &self.project.name),
      ("project.org", &self.project.org),
      ("project.repo", &self.project.repo),
      ("project.base_branch", &self.project.base_branch),
      ("website.template", &self.website.template),
      ("website.output", &self.website.output),
    ] {
      if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
      }
    }

    let mut seen = HashSet::new();
    for target in &self.targets {
      target.validate()?;
      if !seen.insert(target.name.as_str()) {
        return Err(invalid("targets", &format!("duplicate target name '{}'", target.name)));
      }
    }

    if self.integration.names.iter().any(|n| n.trim().is_empty()) {
      return Err(invalid("integration.names", "names must not be empty"));
    }
    if self.integration.commands.iter().any(|argv| argv.is_empty()) {
      return Err(invalid("integration.commands", "every command needs a program"));
    }

    Ok(())
  }
}

fn invalid(field: &str, reason: &str) -> PostrelError {
  PostrelError::Config(ConfigError::Invalid {
    field: field.to_string(),
    reason: reason.to_string(),
  })
}
