//! Integration tests for `release-rail publish`

use crate::helpers::{TestWorkspace, git, run_release_rail, run_release_rail_ok, stderr, stdout};
use anyhow::Result;
use serde_json::json;

const INSTALL_OK: &[&str] = &["git", "--version"];
const INSTALL_FAILS: &[&str] = &["git", "no-such-subcommand"];

#[test]
fn test_dirty_tree_aborts_before_any_step() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[])?;
  ws.write_config("2.0.0", INSTALL_OK)?;
  std::fs::write(ws.path.join("app/scratch.txt"), "wip")?;

  let output = run_release_rail(&ws.path, &["publish"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("uncommitted changes"));
  assert_eq!(ws.progress()?, None, "no progress may be recorded");
  assert_eq!(ws.manifest("app")?["version"], "1.0.0");

  Ok(())
}

#[test]
fn test_wrong_branch_aborts() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  let repo = ws.add_repository("app", &[])?;
  ws.write_config("2.0.0", INSTALL_OK)?;
  git(&repo, &["checkout", "-b", "feature"])?;

  let output = run_release_rail(&ws.path, &["publish"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("expected branch 'main'"));
  assert_eq!(ws.progress()?, None);

  Ok(())
}

#[test]
fn test_failed_step_leaves_marker_and_resume_skips_earlier_steps() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[("@org/lib", "^1.0.0"), ("left-pad", "^1.3.0")])?;
  ws.write_config("2.0.0", INSTALL_FAILS)?;

  let output = run_release_rail(&ws.path, &["publish"])?;
  assert!(!output.status.success());
  assert!(stderr(&output).contains("step 'install-dependencies' failed"));
  assert_eq!(ws.progress()?, Some(json!({"app": "install-dependencies"})));

  let manifest = ws.manifest("app")?;
  assert_eq!(manifest["version"], "2.0.0");
  assert_eq!(manifest["dependencies"]["@org/lib"], "^2.0.0");
  assert_eq!(manifest["dependencies"]["left-pad"], "^1.3.0");

  // Undo the version bump by hand: a resumed run must not redo update-manifest
  let path = ws.path.join("app/package.json");
  let content = std::fs::read_to_string(&path)?.replace("\"version\": \"2.0.0\"", "\"version\": \"1.0.0\"");
  std::fs::write(&path, content)?;

  ws.write_config("2.0.0", INSTALL_OK)?;
  let output = run_release_rail(&ws.path, &["publish"])?;

  // Local steps and push succeed; the hosted release cannot be created for a made-up repository
  assert!(!output.status.success());
  assert!(stdout(&output).contains("Resuming app at step 'install-dependencies'"));
  assert_eq!(ws.progress()?, Some(json!({"app": "create-release"})));
  assert_eq!(ws.manifest("app")?["version"], "1.0.0");
  assert_eq!(ws.git_log("app", 1)?, vec!["chore: release 2.0.0"]);
  assert_eq!(ws.remote_tags("app")?, vec!["v2.0.0"]);

  Ok(())
}

#[test]
fn test_unknown_marker_is_fatal() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[])?;
  ws.write_config("2.0.0", INSTALL_OK)?;
  ws.write_progress(json!({"app": "deploy"}))?;

  let output = run_release_rail(&ws.path, &["publish"])?;

  assert_eq!(output.status.code(), Some(3));
  assert!(stderr(&output).contains("unknown step 'deploy'"));
  assert_eq!(ws.progress()?, Some(json!({"app": "deploy"})));
  assert_eq!(ws.manifest("app")?["version"], "1.0.0");

  Ok(())
}

#[test]
fn test_completed_repositories_are_skipped_and_store_cleared() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("lib", &[])?;
  ws.add_repository("app", &[("@org/lib", "^1.0.0")])?;
  ws.write_config("2.0.0", INSTALL_OK)?;
  ws.write_progress(json!({"lib": "complete", "app": "complete"}))?;

  let output = run_release_rail_ok(&ws.path, &["publish"])?;

  assert!(stdout(&output).contains("lib already published, skipping"));
  assert_eq!(ws.progress()?, Some(json!({})));
  assert_eq!(ws.git_log("app", 1)?, vec!["Initial commit"]);

  Ok(())
}

#[test]
fn test_version_flag_overrides_config() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[])?;
  ws.write_config("2.0.0", INSTALL_FAILS)?;

  let output = run_release_rail(&ws.path, &["publish", "--version", "3.0.0-rc.1"])?;

  assert!(!output.status.success());
  assert!(stdout(&output).contains("Publish plan for v3.0.0-rc.1"));
  assert_eq!(ws.manifest("app")?["version"], "3.0.0-rc.1");

  Ok(())
}

#[test]
fn test_allow_dirty_skips_clean_check() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[])?;
  ws.write_config("2.0.0", INSTALL_FAILS)?;
  std::fs::write(ws.path.join("app/scratch.txt"), "wip")?;

  let output = run_release_rail(&ws.path, &["publish", "--allow-dirty"])?;

  // Gets past the precondition and fails later, at install
  assert!(stderr(&output).contains("install-dependencies"));
  assert_eq!(ws.progress()?, Some(json!({"app": "install-dependencies"})));

  Ok(())
}

#[test]
fn test_invalid_version_is_user_error() -> Result<()> {
  let mut ws = TestWorkspace::new()?;
  ws.add_repository("app", &[])?;
  ws.write_config("not-a-version", INSTALL_OK)?;

  let output = run_release_rail(&ws.path, &["publish"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("version"));

  Ok(())
}
