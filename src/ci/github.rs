//! GitHub workflow runs and releases via the gh CLI
//!
//! The remote service is reached through `gh api`, the same way git is reached
//! through system git: one subprocess per call, JSON on stdout. Authentication
//! is whatever `gh auth` already holds.

use crate::core::error::{PublishError, PublishResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::process::Command;

/// Status of a workflow run as reported by GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Queued,
  InProgress,
  Completed,
  /// `waiting`, `requested`, `pending` and anything newer
  #[serde(other)]
  Other,
}

/// A GitHub Actions workflow run (fields this tool reads)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
  pub id: u64,
  pub status: RunStatus,
  /// `success`, `failure`, `cancelled`, ...; set once completed
  #[serde(default)]
  pub conclusion: Option<String>,
  #[serde(default)]
  pub head_branch: Option<String>,
  pub head_sha: String,
  pub event: String,
  #[serde(default)]
  pub name: Option<String>,
}

impl WorkflowRun {
  pub fn is_completed(&self) -> bool {
    self.status == RunStatus::Completed
  }
}

#[derive(Debug, Deserialize)]
struct WorkflowRunList {
  #[serde(default)]
  workflow_runs: Vec<WorkflowRun>,
}

/// A hosted release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
  pub id: u64,
  pub tag_name: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub prerelease: bool,
  #[serde(default)]
  pub html_url: Option<String>,
}

/// Parameters for creating a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
  pub tag_name: String,
  pub name: String,
  pub prerelease: bool,
  pub draft: bool,
}

/// Remote CI and release hosting
pub trait ReleaseHost {
  /// Workflow runs for a repository, filtered by commit where supported
  fn list_workflow_runs(&self, owner: &str, repo: &str, head_sha: Option<&str>) -> PublishResult<Vec<WorkflowRun>>;

  /// The release for a tag, if one exists
  fn find_release(&self, owner: &str, repo: &str, tag: &str) -> PublishResult<Option<Release>>;

  fn create_release(&self, owner: &str, repo: &str, release: &NewRelease) -> PublishResult<Release>;
}

impl<T: ReleaseHost + ?Sized> ReleaseHost for &T {
  fn list_workflow_runs(&self, owner: &str, repo: &str, head_sha: Option<&str>) -> PublishResult<Vec<WorkflowRun>> {
    (**self).list_workflow_runs(owner, repo, head_sha)
  }

  fn find_release(&self, owner: &str, repo: &str, tag: &str) -> PublishResult<Option<Release>> {
    (**self).find_release(owner, repo, tag)
  }

  fn create_release(&self, owner: &str, repo: &str, release: &NewRelease) -> PublishResult<Release> {
    (**self).create_release(owner, repo, release)
  }
}

/// `ReleaseHost` backed by the GitHub CLI
#[derive(Debug, Clone)]
pub struct GhCli {
  program: String,
}

impl Default for GhCli {
  fn default() -> Self {
    Self::new()
  }
}

impl GhCli {
  pub fn new() -> Self {
    Self {
      program: "gh".to_string(),
    }
  }

  /// Run `gh api <args>`; a 404 becomes `Ok(None)`
  fn api(&self, args: &[&str]) -> PublishResult<Option<String>> {
    let output = Command::new(&self.program)
      .arg("api")
      .args(["-H", "Accept: application/vnd.github+json"])
      .args(args)
      .output()
      .with_context(|| format!("Failed to run {} api (is the GitHub CLI installed?)", self.program))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("HTTP 404") || stderr.contains("Not Found") {
        return Ok(None);
      }
      return Err(PublishError::message(format!(
        "gh api {} failed: {}",
        args.first().copied().unwrap_or_default(),
        stderr.trim()
      )));
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
  }
}

impl ReleaseHost for GhCli {
  fn list_workflow_runs(&self, owner: &str, repo: &str, head_sha: Option<&str>) -> PublishResult<Vec<WorkflowRun>> {
    let mut endpoint = format!("repos/{}/{}/actions/runs?per_page=100", owner, repo);
    if let Some(sha) = head_sha {
      endpoint.push_str("&head_sha=");
      endpoint.push_str(sha);
    }

    let body = self
      .api(&[&endpoint])?
      .ok_or_else(|| PublishError::message(format!("Repository {}/{} not found on GitHub", owner, repo)))?;
    let list: WorkflowRunList = serde_json::from_str(&body).context("Failed to decode workflow runs")?;

    // Not every API version honours head_sha
    Ok(
      list
        .workflow_runs
        .into_iter()
        .filter(|run| head_sha.is_none_or(|sha| run.head_sha == sha))
        .collect(),
    )
  }

  fn find_release(&self, owner: &str, repo: &str, tag: &str) -> PublishResult<Option<Release>> {
    let endpoint = format!("repos/{}/{}/releases/tags/{}", owner, repo, tag);
    match self.api(&[&endpoint])? {
      Some(body) => Ok(Some(serde_json::from_str(&body).context("Failed to decode release")?)),
      None => Ok(None),
    }
  }

  fn create_release(&self, owner: &str, repo: &str, release: &NewRelease) -> PublishResult<Release> {
    let endpoint = format!("repos/{}/{}/releases", owner, repo);
    let tag = format!("tag_name={}", release.tag_name);
    let name = format!("name={}", release.name);
    let prerelease = format!("prerelease={}", release.prerelease);
    let draft = format!("draft={}", release.draft);

    let body = self
      .api(&[&endpoint, "--method", "POST", "-f", &tag, "-f", &name, "-F", &prerelease, "-F", &draft])?
      .ok_or_else(|| PublishError::message(format!("Repository {}/{} not found on GitHub", owner, repo)))?;
    serde_json::from_str(&body).context("Failed to decode created release")
  }
}
