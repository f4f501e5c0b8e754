//! Unified context - build once, pass everywhere
//!
//! Loads `release.toml` once in main.rs and resolves the paths every command
//! needs (the config directory and the progress file).

use crate::core::config::ReleaseConfig;
use crate::core::error::PublishResult;
use crate::core::plan::{PlanOverrides, PublishPlan};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PublishContext {
  /// Directory relative config paths resolve against
  pub config_dir: PathBuf,

  /// Parsed release.toml
  pub config: ReleaseConfig,
}

impl PublishContext {
  /// Load config from `explicit` or by searching `cwd`
  pub fn build(cwd: &Path, explicit: Option<&Path>) -> PublishResult<Self> {
    let (config, config_dir) = ReleaseConfig::load(cwd, explicit)?;
    Ok(Self { config_dir, config })
  }

  /// Location of the progress state file
  pub fn progress_path(&self) -> PathBuf {
    self.config.progress_path(&self.config_dir)
  }

  /// Build the immutable plan for this run
  pub fn plan(&self, overrides: &PlanOverrides) -> PublishResult<PublishPlan> {
    PublishPlan::build(&self.config, &self.config_dir, overrides)
  }
}
