//! System git backend - zero dependencies
//!
//! Every operation is one git subprocess with an isolated environment. The
//! release steps built on top of these calls must be safe to repeat, so the
//! read-side queries here (clean tree, tag targets) are what the mutating
//! operations consult before acting.

use crate::core::error::{GitError, PublishError, PublishResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,

  /// Work-tree-relative paths left out of status checks and commits
  pub(crate) excluded: Vec<String>,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> PublishResult<Self> {
    if !path.exists() {
      return Err(PublishError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }

    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(PublishError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(PublishError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
      excluded: Vec::new(),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> PublishResult<String> {
    self.run(&["rev-parse", "HEAD"])
  }

  /// Get current branch name
  pub fn current_branch(&self) -> PublishResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string()); // Detached HEAD
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// True when neither the index nor the working tree has changes
  ///
  /// Untracked files count as changes.
  pub fn is_clean(&self) -> PublishResult<bool> {
    let pathspec = self.pathspec();
    let mut args = vec!["status", "--porcelain"];
    args.extend(pathspec.iter().map(String::as_str));
    let status = self.run(&args)?;
    Ok(status.is_empty())
  }

  /// Ignore `path` in `is_clean` and `commit_all`
  ///
  /// Paths outside the working tree are not affected by either and are skipped.
  pub fn exclude_path(&mut self, path: &Path) {
    if let Some(relative) = self.relative_to_work_tree(path) {
      self.excluded.push(relative);
    }
  }

  fn relative_to_work_tree(&self, path: &Path) -> Option<String> {
    let name = path.file_name()?;
    let parent = match path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p,
      _ => Path::new("."),
    };
    // The file itself may not exist yet; its directory must
    let dir = parent.canonicalize().ok()?;
    let root = self.work_tree.canonicalize().ok()?;
    let relative = dir.join(name).strip_prefix(&root).ok()?.to_path_buf();
    Some(relative.to_string_lossy().replace('\\', "/"))
  }

  /// Pathspec covering the whole tree minus excluded paths (empty when nothing is excluded)
  pub(crate) fn pathspec(&self) -> Vec<String> {
    if self.excluded.is_empty() {
      return Vec::new();
    }
    let mut spec = vec!["--".to_string(), ":(top)".to_string()];
    spec.extend(self.excluded.iter().map(|p| format!(":(top,exclude){}", p)));
    spec
  }

  /// Commit a tag points at, or None if the tag does not exist
  pub fn tag_target(&self, tag: &str) -> PublishResult<Option<String>> {
    let spec = format!("refs/tags/{}^{{commit}}", tag);
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &spec])
      .output()
      .context("Failed to resolve tag")?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// URL of a configured remote
  pub fn remote_url(&self, name: &str) -> PublishResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["remote", "get-url", name])
      .output()
      .context("Failed to read remote URL")?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// Run git and return trimmed stdout, mapping failure to `GitError::CommandFailed`
  pub(crate) fn run(&self, args: &[&str]) -> PublishResult<String> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      return Err(PublishError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH, HOME and SSH agent access
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    for var in ["PATH", "HOME", "SSH_AUTH_SOCK"] {
      if let Ok(value) = std::env::var(var) {
        cmd.env(var, value);
      }
    }

    // Force safe behavior (override user config)
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}
