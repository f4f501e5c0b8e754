//! Error types for release-rail with contextual messages and exit codes
//!
//! Every fatal condition carries enough context (repository, step, cause) for an
//! operator to fix the problem and re-run. Re-running resumes from the persisted
//! progress marker, so no error here is ever retried automatically.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for release-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, subprocesses, I/O)
  System = 2,
  /// Validation failure (preconditions, CI workflows)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for release-rail
#[derive(Debug)]
pub enum PublishError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// A repository is not in a state where publishing may start
  Precondition(PreconditionError),

  /// A step failed; the progress marker stays in place for resumption
  Step {
    repository: String,
    step: String,
    source: Box<PublishError>,
    context: Option<String>,
  },

  /// CI workflow validation failed
  Workflow(WorkflowError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl PublishError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    PublishError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    PublishError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Wrap a step failure with the repository and step it happened in
  pub fn step(repository: impl Into<String>, step: impl Into<String>, source: PublishError) -> Self {
    PublishError::Step {
      repository: repository.into(),
      step: step.into(),
      source: Box::new(source),
      context: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      PublishError::Message { message, context, help } => PublishError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      PublishError::Io(err) => PublishError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      PublishError::Step {
        repository,
        step,
        source,
        context,
      } => PublishError::Step {
        repository,
        step,
        source,
        context: Some(context.map(|c| format!("{}\n{}", c, ctx_str)).unwrap_or(ctx_str)),
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PublishError::Config(_) => ExitCode::User,
      PublishError::Git(_) => ExitCode::System,
      PublishError::Precondition(_) => ExitCode::Validation,
      PublishError::Step { source, .. } => source.exit_code(),
      PublishError::Workflow(_) => ExitCode::Validation,
      PublishError::Io(_) => ExitCode::System,
      PublishError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      PublishError::Config(e) => e.help_message(),
      PublishError::Git(e) => e.help_message(),
      PublishError::Precondition(e) => e.help_message(),
      PublishError::Step { source, .. } => Some(
        source
          .help_message()
          .map(|h| format!("{}\nFix the cause and re-run `release-rail publish` to resume.", h))
          .unwrap_or_else(|| "Fix the cause and re-run `release-rail publish` to resume at this step.".to_string()),
      ),
      PublishError::Workflow(e) => e.help_message(),
      PublishError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::Config(e) => write!(f, "{}", e),
      PublishError::Git(e) => write!(f, "{}", e),
      PublishError::Precondition(e) => write!(f, "{}", e),
      PublishError::Step {
        repository,
        step,
        source,
        context,
      } => {
        write!(f, "[{}] step '{}' failed: {}", repository, step, source)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
      PublishError::Workflow(e) => write!(f, "{}", e),
      PublishError::Io(e) => write!(f, "I/O error: {}", e),
      PublishError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for PublishError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      PublishError::Io(e) => Some(e),
      PublishError::Step { source, .. } => Some(source.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for PublishError {
  fn from(err: io::Error) -> Self {
    PublishError::Io(err)
  }
}

impl From<String> for PublishError {
  fn from(msg: String) -> Self {
    PublishError::message(msg)
  }
}

impl From<&str> for PublishError {
  fn from(msg: &str) -> Self {
    PublishError::message(msg)
  }
}

impl From<toml_edit::de::Error> for PublishError {
  fn from(err: toml_edit::de::Error) -> Self {
    PublishError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for PublishError {
  fn from(err: serde_json::Error) -> Self {
    PublishError::message(format!("JSON error: {}", err))
  }
}

impl From<serde_yaml::Error> for PublishError {
  fn from(err: serde_yaml::Error) -> Self {
    PublishError::message(format!("YAML error: {}", err))
  }
}

impl From<semver::Error> for PublishError {
  fn from(err: semver::Error) -> Self {
    PublishError::message(format!("Invalid version: {}", err))
  }
}

impl From<WorkflowError> for PublishError {
  fn from(err: WorkflowError) -> Self {
    PublishError::Workflow(err)
  }
}

impl From<GitError> for PublishError {
  fn from(err: GitError) -> Self {
    PublishError::Git(err)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// release.toml not found
  NotFound { search_root: PathBuf },

  /// A field holds a value that cannot be used
  InvalidField { field: String, reason: String },

  /// Repository not found in configuration
  RepositoryNotFound { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create release.toml with `version`, `organization` and `[[repositories]]` entries.".to_string())
      }
      ConfigError::RepositoryNotFound { .. } => Some("Run `release-rail status` to list configured repositories.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No release-rail configuration found.\nExpected file: {}/release.toml",
          search_root.display()
        )
      }
      ConfigError::InvalidField { field, reason } => {
        write!(f, "Invalid value for '{}' in config: {}", field, reason)
      }
      ConfigError::RepositoryNotFound { name } => {
        write!(f, "Repository '{}' not found in configuration", name)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// A tag exists but does not point at the commit being released
  TagMismatch { tag: String, target: String, head: String },

  /// Push failed
  PushFailed { remote: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Integrate them, then re-run to resume.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your SSH key permissions and GitHub access.".to_string())
        } else {
          None
        }
      }
      GitError::RepoNotFound { path } => Some(format!(
        "Clone the repository first or fix its `path` in release.toml: {}",
        path.display()
      )),
      GitError::TagMismatch { tag, .. } => Some(format!(
        "Delete the stale tag (`git tag -d {}`) if it was never pushed, or bump the target version.",
        tag
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::TagMismatch { tag, target, head } => {
        write!(f, "Tag {} already exists at {} but HEAD is {}", tag, target, head)
      }
      GitError::PushFailed { remote, reason } => {
        write!(f, "Push to {} failed: {}", remote, reason)
      }
    }
  }
}

/// Conditions that stop a repository before its first step runs
#[derive(Debug)]
pub enum PreconditionError {
  /// Checked-out branch differs from the configured release branch
  WrongBranch {
    repository: String,
    expected: String,
    actual: String,
  },

  /// Local modifications on a fresh (non-resumed) run
  UncommittedChanges { repository: String },

  /// The persisted marker names a step this tool does not know
  UnknownStep { repository: String, marker: String },
}

impl PreconditionError {
  fn help_message(&self) -> Option<String> {
    match self {
      PreconditionError::WrongBranch { expected, .. } => Some(format!("Check out '{}' and re-run.", expected)),
      PreconditionError::UncommittedChanges { .. } => {
        Some("Commit or stash local changes, or pass --allow-dirty to publish anyway.".to_string())
      }
      PreconditionError::UnknownStep { repository, .. } => Some(format!(
        "Inspect the progress file, then run `release-rail reset --repo {}` to start the repository over.",
        repository
      )),
    }
  }
}

impl fmt::Display for PreconditionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PreconditionError::WrongBranch {
        repository,
        expected,
        actual,
      } => write!(f, "[{}] expected branch '{}' but '{}' is checked out", repository, expected, actual),
      PreconditionError::UncommittedChanges { repository } => {
        write!(f, "[{}] working tree has uncommitted changes", repository)
      }
      PreconditionError::UnknownStep { repository, marker } => write!(
        f,
        "[{}] progress file records unknown step '{}'; refusing to guess where to resume",
        repository, marker
      ),
    }
  }
}

/// CI workflow validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
  /// No run for the commit appeared within the allowed attempts
  NeverStarted { repository: String, sha: String, attempts: u32 },

  /// The locked run did not complete within the allowed attempts
  TimedOut { repository: String, run_id: u64, attempts: u32 },

  /// More than one unfinished run exists for the same commit
  ParallelRuns { repository: String, sha: String, run_ids: Vec<u64> },

  /// The run completed with a non-success conclusion
  Failed {
    repository: String,
    run_id: u64,
    conclusion: String,
  },

  /// The remote CI query itself failed
  Query { repository: String, reason: String },
}

impl WorkflowError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkflowError::NeverStarted { .. } => {
        Some("Check that the workflow trigger matches the pushed branch or release event.".to_string())
      }
      WorkflowError::ParallelRuns { .. } => {
        Some("Cancel the duplicate runs in GitHub Actions and re-run to validate again.".to_string())
      }
      WorkflowError::Failed { .. } => Some("Inspect the workflow logs, fix the failure and re-run.".to_string()),
      WorkflowError::TimedOut { .. } => {
        Some("The workflow is still running; re-run once it has progressed further.".to_string())
      }
      WorkflowError::Query { .. } => Some("Make sure the `gh` CLI is installed and authenticated.".to_string()),
    }
  }
}

impl fmt::Display for WorkflowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkflowError::NeverStarted {
        repository,
        sha,
        attempts,
      } => write!(
        f,
        "{}: no workflow run started for commit {} after {} attempt(s)",
        repository, sha, attempts
      ),
      WorkflowError::TimedOut {
        repository,
        run_id,
        attempts,
      } => write!(
        f,
        "{}: workflow run {} did not complete after {} attempt(s)",
        repository, run_id, attempts
      ),
      WorkflowError::ParallelRuns {
        repository,
        sha,
        run_ids,
      } => {
        let ids: Vec<String> = run_ids.iter().map(|id| id.to_string()).collect();
        write!(
          f,
          "{}: parallel workflow runs for commit {} ({})",
          repository,
          sha,
          ids.join(", ")
        )
      }
      WorkflowError::Failed {
        repository,
        run_id,
        conclusion,
      } => write!(f, "{}: workflow run {} concluded with '{}'", repository, run_id, conclusion),
      WorkflowError::Query { repository, reason } => {
        write!(f, "{}: failed to query workflow runs: {}", repository, reason)
      }
    }
  }
}

/// Result type alias for release-rail
pub type PublishResult<T> = Result<T, PublishError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> PublishResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> PublishResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<PublishError>,
{
  fn context(self, ctx: impl Into<String>) -> PublishResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> PublishResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &PublishError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
