//! The immutable publish plan
//!
//! Built once at startup from `release.toml` plus command-line overrides and
//! never mutated afterwards. Repositories keep their declaration order; that
//! order is the processing order.

use crate::core::config::{ReleaseConfig, ValidationConfig};
use crate::core::error::PublishResult;
use std::path::{Path, PathBuf};

/// Overrides accepted on the command line
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
  pub version: Option<String>,
  pub allow_dirty: bool,
}

/// A repository as it will be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRepository {
  /// Identifier and progress key
  pub name: String,
  /// Absolute (or config-relative resolved) checkout path
  pub path: PathBuf,
  /// Configured `owner/repo`; resolved from the origin remote when absent
  pub github: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishPlan {
  pub version: semver::Version,
  pub organization: String,
  pub repositories: Vec<PlannedRepository>,
  pub ignore_uncommitted: bool,
  pub branch: String,
  pub remote: String,
  pub package_manager: Vec<String>,
  pub validation: ValidationConfig,
  /// Progress file location; kept out of release commits
  pub progress_file: PathBuf,
}

impl PublishPlan {
  /// Build the plan from config, resolving repository paths against `base`
  pub fn build(config: &ReleaseConfig, base: &Path, overrides: &PlanOverrides) -> PublishResult<Self> {
    let version_text = overrides.version.as_deref().unwrap_or(&config.version);
    let version = semver::Version::parse(version_text)?;

    let repositories = config
      .repositories
      .iter()
      .map(|r| PlannedRepository {
        name: r.name.clone(),
        path: if r.path.is_absolute() {
          r.path.clone()
        } else {
          base.join(&r.path)
        },
        github: r.github.clone(),
      })
      .collect();

    Ok(Self {
      version,
      organization: config.organization.trim_start_matches('@').to_string(),
      repositories,
      ignore_uncommitted: config.ignore_uncommitted || overrides.allow_dirty,
      branch: config.branch.clone(),
      remote: config.remote.clone(),
      package_manager: config.package_manager.clone(),
      validation: config.validation.clone(),
      progress_file: config.progress_path(base),
    })
  }

  /// Dependency name prefix owned by the organization, e.g. `@org/`
  pub fn dependency_prefix(&self) -> String {
    format!("@{}/", self.organization)
  }

  /// Tag name for the target version
  pub fn tag_name(&self) -> String {
    format!("v{}", self.version)
  }

  /// Commit message used for the version bump
  pub fn commit_message(&self) -> String {
    format!("chore: release {}", self.version)
  }

  pub fn is_prerelease(&self) -> bool {
    !self.version.pre.is_empty()
  }
}
