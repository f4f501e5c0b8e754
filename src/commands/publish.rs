use std::io::IsTerminal;

use crate::ci::GhCli;
use crate::core::context::PublishContext;
use crate::core::error::{ConfigError, PublishError, PublishResult};
use crate::core::plan::{PlanOverrides, PublishPlan};
use crate::publish::{RepositoryPublisher, Sequencer, StepId};
use crate::state::{COMPLETE_MARKER, ProgressStore};

/// Run the publish command
pub fn run_publish(ctx: &PublishContext, overrides: PlanOverrides) -> PublishResult<()> {
  let plan = ctx.plan(&overrides)?;
  let mut store = ProgressStore::load(&ctx.progress_path())?;

  print_plan(&plan, &store);

  let host = GhCli::new();
  let names: Vec<&str> = plan.repositories.iter().map(|r| r.name.as_str()).collect();

  Sequencer::new(&mut store, &StepId::ALL)
    .with_progress(std::io::stderr().is_terminal())
    .run_all(&names, |name| {
      let repo = plan
        .repositories
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| PublishError::Config(ConfigError::RepositoryNotFound { name: name.to_string() }))?;
      RepositoryPublisher::open(&plan, repo, &host)
    })?;

  println!();
  println!("✅ Published {} to {} repositories", plan.tag_name(), plan.repositories.len());
  Ok(())
}

fn print_plan(plan: &PublishPlan, store: &ProgressStore) {
  println!("📦 Publish plan for {}", plan.tag_name());
  println!();
  println!("  Version:  {}{}", plan.version, if plan.is_prerelease() { " (pre-release)" } else { "" });
  println!("  Prefix:   {}", plan.dependency_prefix());
  println!("  Branch:   {} -> {}", plan.branch, plan.remote);
  if plan.ignore_uncommitted {
    println!("  ⚠️  Uncommitted changes are allowed");
  }
  if !store.is_empty() {
    println!("  ⏳ Resuming from {}", store.path().display());
  }
  println!();

  for repo in &plan.repositories {
    let state = match store.marker(&repo.name) {
      None => "pending".to_string(),
      Some(COMPLETE_MARKER) => "done".to_string(),
      Some(step) => format!("resume at '{}'", step),
    };
    println!("  {:<24} {}", repo.name, state);
  }
  println!();
}
