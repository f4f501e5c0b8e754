//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A directory holding release.toml, repository checkouts and their bare remotes
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
  repositories: Vec<String>,
}

impl TestWorkspace {
  /// Create an empty workspace
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    Ok(Self {
      _root: root,
      path,
      repositories: Vec::new(),
    })
  }

  /// Add a repository at version 1.0.0 with a bare `origin` remote
  pub fn add_repository(&mut self, name: &str, deps: &[(&str, &str)]) -> Result<PathBuf> {
    let repo = self.path.join(name);
    let remote = self.path.join("remotes").join(format!("{}.git", name));
    std::fs::create_dir_all(&repo)?;
    std::fs::create_dir_all(&remote)?;

    git(&remote, &["init", "--bare", "--initial-branch=main"])?;
    git(&repo, &["init", "--initial-branch=main"])?;
    git(&repo, &["config", "user.name", "Test User"])?;
    git(&repo, &["config", "user.email", "test@example.com"])?;
    git(&repo, &["config", "commit.gpgsign", "false"])?;
    git(&repo, &["config", "tag.gpgsign", "false"])?;

    let dependencies: serde_json::Map<String, serde_json::Value> = deps
      .iter()
      .map(|(dep, range)| (dep.to_string(), serde_json::Value::String(range.to_string())))
      .collect();
    let manifest = serde_json::json!({
      "name": format!("@org/{}", name),
      "version": "1.0.0",
      "dependencies": dependencies,
    });
    std::fs::write(repo.join("package.json"), serde_json::to_string_pretty(&manifest)? + "\n")?;

    git(&repo, &["add", "."])?;
    git(&repo, &["commit", "-m", "Initial commit"])?;
    git(&repo, &["remote", "add", "origin", remote.to_str().context("non-utf8 path")?])?;
    git(&repo, &["push", "origin", "main"])?;

    self.repositories.push(name.to_string());
    Ok(repo)
  }

  /// Write release.toml for every added repository
  pub fn write_config(&self, version: &str, package_manager: &[&str]) -> Result<()> {
    let mut config = format!(
      r#"version = "{}"
organization = "org"
package_manager = {:?}

[validation]
poll_interval_secs = 0
start_attempts = 1
completion_attempts = 1
"#,
      version, package_manager
    );

    for name in &self.repositories {
      config.push_str(&format!(
        "\n[[repositories]]\nname = \"{}\"\npath = \"{}\"\ngithub = \"example-org/{}\"\n",
        name, name, name
      ));
    }

    std::fs::write(self.path.join("release.toml"), config)?;
    Ok(())
  }

  /// Parsed progress file, if present
  pub fn progress(&self) -> Result<Option<serde_json::Value>> {
    let path = self.path.join(".release-progress.json");
    if !path.exists() {
      return Ok(None);
    }
    Ok(Some(serde_json::from_str(&std::fs::read_to_string(path)?)?))
  }

  pub fn write_progress(&self, value: serde_json::Value) -> Result<()> {
    std::fs::write(
      self.path.join(".release-progress.json"),
      serde_json::to_string_pretty(&value)? + "\n",
    )?;
    Ok(())
  }

  /// Parsed package.json of a repository
  pub fn manifest(&self, name: &str) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(self.path.join(name).join("package.json"))?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Tags in a repository's bare remote
  pub fn remote_tags(&self, name: &str) -> Result<Vec<String>> {
    let remote = self.path.join("remotes").join(format!("{}.git", name));
    let output = git(&remote, &["tag", "--list"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }

  /// Get git log of a repository
  pub fn git_log(&self, name: &str, n: usize) -> Result<Vec<String>> {
    let output = git(&self.path.join(name), &["log", &format!("-{}", n), "--format=%s"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect(),
    )
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run release-rail, returning its output whether or not it succeeded
pub fn run_release_rail(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_release-rail");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run release-rail")
}

/// Run release-rail and fail unless it exits successfully
pub fn run_release_rail_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_release_rail(cwd, args)?;

  if !output.status.success() {
    anyhow::bail!(
      "release-rail command failed: release-rail {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }

  Ok(output)
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}
