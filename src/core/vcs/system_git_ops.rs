//! Mutating operations for SystemGit (commit, tag, push)
//!
//! Each operation treats "already done" as success so that a release step
//! interrupted after its side effect can simply be run again.

use super::system_git::SystemGit;
use crate::core::error::{GitError, PublishError, PublishResult, ResultExt};

/// What a repeatable git operation ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// The operation changed the repository
  Changed,
  /// The repository was already in the desired state
  AlreadyDone,
}

impl SystemGit {
  /// Stage everything except excluded paths and commit it
  ///
  /// A clean tree is a no-op, not an error.
  pub fn commit_all(&self, message: &str) -> PublishResult<Applied> {
    if self.is_clean()? {
      return Ok(Applied::AlreadyDone);
    }

    let pathspec = self.pathspec();
    let mut args = vec!["add", "--all"];
    args.extend(pathspec.iter().map(String::as_str));
    self.run(&args)?;
    self.run(&["commit", "--no-verify", "-m", message])?;
    Ok(Applied::Changed)
  }

  /// Create an annotated tag at HEAD
  ///
  /// An existing tag at HEAD is a no-op; an existing tag anywhere else fails
  /// with `GitError::TagMismatch` instead of being moved.
  pub fn create_tag(&self, tag: &str, message: &str) -> PublishResult<Applied> {
    let head = self.head_commit()?;

    if let Some(target) = self.tag_target(tag)? {
      if target == head {
        return Ok(Applied::AlreadyDone);
      }
      return Err(PublishError::Git(GitError::TagMismatch {
        tag: tag.to_string(),
        target,
        head,
      }));
    }

    self.run(&["tag", "-a", tag, "-m", message])?;
    Ok(Applied::Changed)
  }

  /// Push HEAD to `branch` and the tag in one atomic push
  ///
  /// Pushing refs the remote already has succeeds, so this is repeatable.
  pub fn push_release(&self, remote: &str, branch: &str, tag: &str) -> PublishResult<()> {
    let head_ref = format!("HEAD:refs/heads/{}", branch);
    let tag_ref = format!("refs/tags/{}", tag);

    let output = self
      .git_cmd()
      .args(["push", "--atomic", remote, &head_ref, &tag_ref])
      .output()
      .context("Failed to push")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(PublishError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        reason: stderr.trim().to_string(),
      }));
    }

    Ok(())
  }
}
