//! The fixed, ordered list of release steps
//!
//! A step is identified by a stable kebab-case name. That name is what the
//! progress file stores, so renaming a variant's name breaks resumption of
//! runs interrupted by an older build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
  /// Set the manifest version and bump organization dependencies
  UpdateManifest,
  /// Run the package manager install
  InstallDependencies,
  /// Commit the version bump
  Commit,
  /// Tag `v<version>` at HEAD
  Tag,
  /// Push the branch and tag atomically
  Push,
  /// Wait for the push-triggered workflow run
  ValidatePushWorkflow,
  /// Create the hosted release for the tag
  CreateRelease,
  /// Wait for the release-triggered workflow run
  ValidateReleaseWorkflow,
}

impl StepId {
  /// Every step in execution order
  pub const ALL: [StepId; 8] = [
    StepId::UpdateManifest,
    StepId::InstallDependencies,
    StepId::Commit,
    StepId::Tag,
    StepId::Push,
    StepId::ValidatePushWorkflow,
    StepId::CreateRelease,
    StepId::ValidateReleaseWorkflow,
  ];

  pub fn name(self) -> &'static str {
    match self {
      StepId::UpdateManifest => "update-manifest",
      StepId::InstallDependencies => "install-dependencies",
      StepId::Commit => "commit",
      StepId::Tag => "tag",
      StepId::Push => "push",
      StepId::ValidatePushWorkflow => "validate-push-workflow",
      StepId::CreateRelease => "create-release",
      StepId::ValidateReleaseWorkflow => "validate-release-workflow",
    }
  }

  /// One-line description for `release-rail steps`
  pub fn describe(self) -> &'static str {
    match self {
      StepId::UpdateManifest => "set package.json version and ^version for organization dependencies",
      StepId::InstallDependencies => "run the configured package manager install",
      StepId::Commit => "commit all changes (no-op when the tree is clean)",
      StepId::Tag => "create tag v<version> at HEAD (no-op when it already points there)",
      StepId::Push => "push branch and tag atomically",
      StepId::ValidatePushWorkflow => "wait for the push workflow on the release branch, if declared",
      StepId::CreateRelease => "create the GitHub release (no-op when it already exists)",
      StepId::ValidateReleaseWorkflow => "wait for the release-published workflow, if declared",
    }
  }
}

impl fmt::Display for StepId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for StepId {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    StepId::ALL
      .iter()
      .copied()
      .find(|step| step.name() == s)
      .ok_or_else(|| format!("unknown step '{}'", s))
  }
}
