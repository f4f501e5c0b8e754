use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::core::context::PublishContext;
use crate::core::error::PublishResult;
use crate::core::plan::PlanOverrides;
use crate::publish::StepId;
use crate::state::{COMPLETE_MARKER, ProgressStore};

/// Where a repository stands in the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepositoryState {
  /// No marker recorded
  NotStarted,
  /// Interrupted at (or running) this step
  AtStep { step: String },
  /// Finished in the current run
  Complete,
  /// Marker names no known step; `publish` will refuse to continue
  Invalid { marker: String },
}

impl RepositoryState {
  pub fn from_marker(marker: Option<&str>) -> Self {
    match marker {
      None => RepositoryState::NotStarted,
      Some(COMPLETE_MARKER) => RepositoryState::Complete,
      Some(m) => match m.parse::<StepId>() {
        Ok(step) => RepositoryState::AtStep {
          step: step.name().to_string(),
        },
        Err(_) => RepositoryState::Invalid { marker: m.to_string() },
      },
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryStatus {
  pub name: String,
  pub path: PathBuf,
  #[serde(flatten)]
  pub state: RepositoryState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishStatus {
  pub version: String,
  pub tag: String,
  pub progress_file: PathBuf,
  /// Last write to the progress file, if it exists
  pub updated_at: Option<DateTime<Local>>,
  pub repositories: Vec<RepositoryStatus>,
  /// Markers for repositories no longer in release.toml
  pub orphaned: Vec<String>,
}

/// Gather status without touching any repository
pub fn collect_status(ctx: &PublishContext) -> PublishResult<PublishStatus> {
  let plan = ctx.plan(&PlanOverrides::default())?;
  let path = ctx.progress_path();
  let store = ProgressStore::load(&path)?;

  let updated_at = fs::metadata(&path)
    .and_then(|m| m.modified())
    .ok()
    .map(DateTime::<Local>::from);

  let repositories = plan
    .repositories
    .iter()
    .map(|repo| RepositoryStatus {
      name: repo.name.clone(),
      path: repo.path.clone(),
      state: RepositoryState::from_marker(store.marker(&repo.name)),
    })
    .collect();

  let orphaned = store
    .entries()
    .filter(|(name, _)| !plan.repositories.iter().any(|r| r.name == *name))
    .map(|(name, _)| name.to_string())
    .collect();

  Ok(PublishStatus {
    version: plan.version.to_string(),
    tag: plan.tag_name(),
    progress_file: path,
    updated_at,
    repositories,
    orphaned,
  })
}

/// Run the status command
pub fn run_status(ctx: &PublishContext, json: bool) -> PublishResult<()> {
  let status = collect_status(ctx)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&status)?);
  } else {
    print_status_table(&status);
  }

  Ok(())
}

fn print_status_table(status: &PublishStatus) {
  println!("\n📊 Publish Status for {}\n", status.tag);

  match status.updated_at {
    Some(at) => println!(
      "Progress: {} (updated {})\n",
      status.progress_file.display(),
      at.format("%Y-%m-%d %H:%M:%S")
    ),
    None => println!("Progress: {} (no run in progress)\n", status.progress_file.display()),
  }

  println!("{:<24} STATE", "REPOSITORY");
  println!("{:-<60}", "");

  for repo in &status.repositories {
    let state = match &repo.state {
      RepositoryState::NotStarted => "not started".to_string(),
      RepositoryState::AtStep { step } => format!("at step '{}'", step),
      RepositoryState::Complete => "✅ complete".to_string(),
      RepositoryState::Invalid { marker } => format!("⚠️  unknown step '{}'", marker),
    };
    println!("{:<24} {}", repo.name, state);
  }

  if !status.orphaned.is_empty() {
    println!();
    println!("⚠️  Markers for unknown repositories: {}", status.orphaned.join(", "));
    println!("   Run `release-rail reset` to clear them.");
  }
  println!();
}
