use crate::core::error::{ConfigError, PublishError, PublishResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for release-rail
/// Searched in order: release.toml, .release.toml, .config/release.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Target version for every repository in this run
  pub version: String,

  /// Organization namespace; dependencies named `@<organization>/...` are rewritten
  pub organization: String,

  /// Skip the clean working tree precondition
  #[serde(default)]
  pub ignore_uncommitted: bool,

  /// Branch that must be checked out and is pushed to (default: "main")
  #[serde(default = "default_branch")]
  pub branch: String,

  /// Remote to push to (default: "origin")
  #[serde(default = "default_remote")]
  pub remote: String,

  /// Progress state file, relative to the config directory
  #[serde(default = "default_progress_file")]
  pub progress_file: PathBuf,

  /// Install command run inside each repository (default: ["npm", "install"])
  #[serde(default = "default_package_manager")]
  pub package_manager: Vec<String>,

  #[serde(default)]
  pub validation: ValidationConfig,

  #[serde(default)]
  pub repositories: Vec<RepositoryConfig>,
}

fn default_branch() -> String {
  "main".to_string()
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_progress_file() -> PathBuf {
  PathBuf::from(".release-progress.json")
}

fn default_package_manager() -> Vec<String> {
  vec!["npm".to_string(), "install".to_string()]
}

/// Polling limits for CI workflow validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
  /// Seconds to wait between workflow run queries (default: 2)
  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs: u64,

  /// Attempts allowed for a run to appear at all (default: 10)
  #[serde(default = "default_start_attempts")]
  pub start_attempts: u32,

  /// Attempts allowed for the locked run to complete (default: 30)
  #[serde(default = "default_completion_attempts")]
  pub completion_attempts: u32,
}

fn default_poll_interval_secs() -> u64 {
  2
}

fn default_start_attempts() -> u32 {
  10
}

fn default_completion_attempts() -> u32 {
  30
}

impl Default for ValidationConfig {
  fn default() -> Self {
    Self {
      poll_interval_secs: default_poll_interval_secs(),
      start_attempts: default_start_attempts(),
      completion_attempts: default_completion_attempts(),
    }
  }
}

impl ValidationConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  /// Validate polling limits
  pub fn validate(&self) -> PublishResult<()> {
    if self.start_attempts == 0 {
      return Err(invalid("validation.start_attempts", "must be at least 1"));
    }
    if self.completion_attempts < self.start_attempts {
      return Err(invalid(
        "validation.completion_attempts",
        format!("must be >= start_attempts ({})", self.start_attempts),
      ));
    }
    Ok(())
  }
}

/// A repository taking part in the release
///
/// # Example
///
/// ```toml
/// [[repositories]]
/// name = "lib"
/// path = "../lib"
/// github = "org/lib"  # optional: derived from the origin remote
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
  /// Identifier, also the key in the progress file
  pub name: String,

  /// Local checkout (relative to the config directory)
  pub path: PathBuf,

  /// GitHub `owner/repo` slug
  #[serde(default)]
  pub github: Option<String>,
}

fn invalid(field: &str, reason: impl Into<String>) -> PublishError {
  PublishError::Config(ConfigError::InvalidField {
    field: field.to_string(),
    reason: reason.into(),
  })
}

impl ReleaseConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from an explicit file, or search `dir` for one
  ///
  /// Returns the config together with the directory relative paths resolve against.
  pub fn load(dir: &Path, explicit: Option<&Path>) -> PublishResult<(Self, PathBuf)> {
    let config_path = match explicit {
      Some(p) => p.to_path_buf(),
      None => Self::find_config_path(dir).ok_or_else(|| {
        PublishError::Config(ConfigError::NotFound {
          search_root: dir.to_path_buf(),
        })
      })?,
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config = Self::parse(&content).with_context(|| format!("Invalid config in {}", config_path.display()))?;

    let base = config_path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .map(Path::to_path_buf)
      .unwrap_or_else(|| dir.to_path_buf());

    Ok((config, base))
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> PublishResult<Self> {
    let config: ReleaseConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Validate the whole configuration
  pub fn validate(&self) -> PublishResult<()> {
    if let Err(e) = semver::Version::parse(&self.version) {
      return Err(invalid("version", format!("'{}' is not valid semver ({})", self.version, e)));
    }

    if self.organization.trim().is_empty() {
      return Err(invalid("organization", "must not be empty"));
    }

    if self.branch.trim().is_empty() {
      return Err(invalid("branch", "must not be empty"));
    }

    if self.package_manager.is_empty() {
      return Err(invalid("package_manager", "must name a command"));
    }

    self.validation.validate()?;

    let mut seen = HashSet::new();
    for repo in &self.repositories {
      if repo.name.trim().is_empty() {
        return Err(invalid("repositories.name", "must not be empty"));
      }
      if !seen.insert(repo.name.as_str()) {
        return Err(invalid("repositories.name", format!("duplicate repository '{}'", repo.name)));
      }
      if let Some(slug) = &repo.github
        && crate::utils::split_slug(slug).is_none()
      {
        return Err(invalid(
          "repositories.github",
          format!("'{}' must have the form owner/repo", slug),
        ));
      }
    }

    Ok(())
  }

  /// Progress file location, resolving a relative path against `base`
  pub fn progress_path(&self, base: &Path) -> PathBuf {
    if self.progress_file.is_absolute() {
      self.progress_file.clone()
    } else {
      base.join(&self.progress_file)
    }
  }

  /// Find a repository by name
  pub fn find_repository(&self, name: &str) -> Option<&RepositoryConfig> {
    self.repositories.iter().find(|r| r.name == name)
  }
}
