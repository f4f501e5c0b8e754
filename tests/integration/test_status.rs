//! Integration tests for `release-rail status`, `reset` and `steps`

use crate::helpers::{TestWorkspace, run_release_rail, run_release_rail_ok, stderr, stdout};
use anyhow::Result;
use serde_json::json;

fn workspace() -> Result<TestWorkspace> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("lib", &[])?;
  ws.add_repository("app", &[])?;
  ws.write_config("2.1.0-beta", &["git", "--version"])?;
  Ok(ws)
}

#[test]
fn test_status_json_reports_markers() -> Result<()> {
  let ws = workspace()?;
  ws.write_progress(json!({"lib": "complete", "app": "push"}))?;

  let output = run_release_rail_ok(&ws.path, &["status", "--json"])?;
  let status: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(status["tag"], "v2.1.0-beta");
  assert_eq!(status["repositories"][0]["name"], "lib");
  assert_eq!(status["repositories"][0]["state"], "complete");
  assert_eq!(status["repositories"][1]["state"], "at_step");
  assert_eq!(status["repositories"][1]["step"], "push");
  assert!(status["updated_at"].is_string());

  Ok(())
}

#[test]
fn test_status_text_without_progress() -> Result<()> {
  let ws = workspace()?;

  let output = run_release_rail_ok(&ws.path, &["status"])?;
  let text = stdout(&output);

  assert!(text.contains("no run in progress"));
  assert!(text.contains("not started"));

  Ok(())
}

#[test]
fn test_status_flags_unknown_markers() -> Result<()> {
  let ws = workspace()?;
  ws.write_progress(json!({"app": "deploy", "gone": "tag"}))?;

  let output = run_release_rail_ok(&ws.path, &["status"])?;
  let text = stdout(&output);

  assert!(text.contains("unknown step 'deploy'"));
  assert!(text.contains("Markers for unknown repositories: gone"));

  Ok(())
}

#[test]
fn test_reset_single_repository() -> Result<()> {
  let ws = workspace()?;
  ws.write_progress(json!({"lib": "complete", "app": "deploy"}))?;

  run_release_rail_ok(&ws.path, &["reset", "--repo", "app"])?;

  assert_eq!(ws.progress()?, Some(json!({"lib": "complete"})));
  Ok(())
}

#[test]
fn test_reset_unknown_repository_fails() -> Result<()> {
  let ws = workspace()?;

  let output = run_release_rail(&ws.path, &["reset", "--repo", "nope"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Repository 'nope' not found"));
  Ok(())
}

#[test]
fn test_reset_all() -> Result<()> {
  let ws = workspace()?;
  ws.write_progress(json!({"lib": "complete", "app": "tag"}))?;

  run_release_rail_ok(&ws.path, &["reset"])?;

  assert_eq!(ws.progress()?, Some(json!({})));
  Ok(())
}

#[test]
fn test_steps_lists_fixed_order() -> Result<()> {
  let dir = tempfile::tempdir()?;

  let output = run_release_rail_ok(dir.path(), &["steps"])?;
  let text = stdout(&output);

  let names = [
    "update-manifest",
    "install-dependencies",
    "commit",
    "tag",
    "push",
    "validate-push-workflow",
    "create-release",
    "validate-release-workflow",
  ];
  for (i, name) in names.iter().enumerate() {
    assert!(text.contains(&format!("{}. {}", i + 1, name)), "missing step {}", name);
  }

  Ok(())
}

#[test]
fn test_missing_config_is_user_error() -> Result<()> {
  let dir = tempfile::tempdir()?;

  let output = run_release_rail(dir.path(), &["status"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("release.toml"));
  Ok(())
}
