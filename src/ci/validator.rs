//! Workflow run validation
//!
//! After a push or a release, poll the repository's workflow runs for the
//! released commit until exactly one run of the expected event completes.
//!
//! A session locks onto the first unfinished run it sees. Seeing a second,
//! different unfinished run for the same commit is an anomaly: there is no
//! way to tell which one is authoritative, so validation fails instead of
//! guessing. If no run ever appears the CI trigger is probably missing or
//! misconfigured, and validation fails rather than waiting forever.

use crate::ci::github::{ReleaseHost, WorkflowRun};
use crate::core::config::ValidationConfig;
use crate::core::error::WorkflowError;
use std::thread;
use std::time::Duration;

/// Which trigger a validation session is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
  Push,
  Release,
}

impl TriggerKind {
  /// GitHub's `event` value for runs of this kind
  pub fn event(self) -> &'static str {
    match self {
      TriggerKind::Push => "push",
      TriggerKind::Release => "release",
    }
  }
}

/// Polling limits for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLimits {
  pub interval: Duration,
  /// Attempts allowed before a run must have appeared
  pub start_attempts: u32,
  /// Attempts allowed in total for the locked run to complete
  pub completion_attempts: u32,
}

impl From<&ValidationConfig> for PollLimits {
  fn from(config: &ValidationConfig) -> Self {
    Self {
      interval: config.poll_interval(),
      start_attempts: config.start_attempts,
      completion_attempts: config.completion_attempts.max(config.start_attempts),
    }
  }
}

/// What a single poll concluded
#[derive(Debug, Clone, PartialEq, Eq)]
enum Observation {
  /// Nothing decisive yet
  Pending,
  /// The locked run completed successfully
  Succeeded,
  /// Terminal failure
  Failed(WorkflowError),
}

/// State of one validation (per repository, per trigger kind)
#[derive(Debug, Clone)]
pub struct ValidationSession {
  repository: String,
  sha: String,
  kind: TriggerKind,
  locked: Option<u64>,
  attempts: u32,
}

impl ValidationSession {
  pub fn new(repository: impl Into<String>, sha: impl Into<String>, kind: TriggerKind) -> Self {
    Self {
      repository: repository.into(),
      sha: sha.into(),
      kind,
      locked: None,
      attempts: 0,
    }
  }

  /// Run the session is locked onto, if any
  pub fn locked_run(&self) -> Option<u64> {
    self.locked
  }

  pub fn attempts(&self) -> u32 {
    self.attempts
  }

  /// Fold one polling response into the session
  fn observe(&mut self, runs: &[WorkflowRun]) -> Observation {
    self.attempts += 1;

    let relevant: Vec<&WorkflowRun> = runs
      .iter()
      .filter(|run| run.head_sha == self.sha && run.event == self.kind.event())
      .collect();

    let unfinished: Vec<u64> = relevant.iter().filter(|r| !r.is_completed()).map(|r| r.id).collect();

    for &id in &unfinished {
      match self.locked {
        None => self.locked = Some(id),
        Some(locked) if locked != id => {
          let mut run_ids = vec![locked, id];
          run_ids.sort_unstable();
          return Observation::Failed(WorkflowError::ParallelRuns {
            repository: self.repository.clone(),
            sha: self.sha.clone(),
            run_ids,
          });
        }
        Some(_) => {}
      }
    }

    // A run may finish between two polls, before we ever saw it unfinished
    if self.locked.is_none() {
      self.locked = relevant.iter().filter(|r| r.is_completed()).map(|r| r.id).max();
    }

    let Some(locked) = self.locked else {
      return Observation::Pending;
    };

    match relevant.iter().find(|r| r.id == locked) {
      Some(run) if run.is_completed() => match run.conclusion.as_deref() {
        Some("success") => Observation::Succeeded,
        other => Observation::Failed(WorkflowError::Failed {
          repository: self.repository.clone(),
          run_id: run.id,
          conclusion: other.unwrap_or("unknown").to_string(),
        }),
      },
      _ => Observation::Pending,
    }
  }
}

/// Polls a `ReleaseHost` until a session resolves
pub struct WorkflowValidator<H> {
  host: H,
  limits: PollLimits,
}

impl<H: ReleaseHost> WorkflowValidator<H> {
  pub fn new(host: H, limits: PollLimits) -> Self {
    Self { host, limits }
  }

  /// Block until the workflow for `sha` succeeds, or fail
  ///
  /// The first query is immediate; each later one waits `interval` first.
  pub fn validate(&self, owner: &str, repo: &str, sha: &str, kind: TriggerKind) -> Result<(), WorkflowError> {
    let label = format!("{}/{}", owner, repo);
    let mut session = ValidationSession::new(label.clone(), sha, kind);

    for attempt in 0..self.limits.completion_attempts {
      if attempt > 0 {
        thread::sleep(self.limits.interval);
      }

      let runs = self
        .host
        .list_workflow_runs(owner, repo, Some(sha))
        .map_err(|e| WorkflowError::Query {
          repository: label.clone(),
          reason: e.to_string(),
        })?;

      match session.observe(&runs) {
        Observation::Succeeded => {
          println!(
            "   ✅ {} workflow run {} succeeded",
            kind.event(),
            session.locked_run().unwrap_or_default()
          );
          return Ok(());
        }
        Observation::Failed(err) => return Err(err),
        Observation::Pending => {}
      }

      match session.locked_run() {
        None if session.attempts() >= self.limits.start_attempts => {
          return Err(WorkflowError::NeverStarted {
            repository: label,
            sha: sha.to_string(),
            attempts: session.attempts(),
          });
        }
        None => println!("   ⏳ Waiting for {} workflow to start...", kind.event()),
        Some(id) => println!("   ⏳ Workflow run {} in progress...", id),
      }
    }

    match session.locked_run() {
      Some(run_id) => Err(WorkflowError::TimedOut {
        repository: label,
        run_id,
        attempts: session.attempts(),
      }),
      None => Err(WorkflowError::NeverStarted {
        repository: label,
        sha: sha.to_string(),
        attempts: session.attempts(),
      }),
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::ci::github::{NewRelease, Release, RunStatus};
  use crate::core::error::{PublishError, PublishResult};
  use std::cell::RefCell;
  use std::collections::VecDeque;

  /// Replays one canned response per poll; the last one repeats
  #[derive(Default)]
  pub(crate) struct ScriptedHost {
    pub responses: RefCell<VecDeque<PublishResult<Vec<WorkflowRun>>>>,
    pub polls: RefCell<u32>,
    pub releases: RefCell<Vec<NewRelease>>,
    pub existing_release: Option<Release>,
  }

  impl ScriptedHost {
    pub fn new(responses: Vec<Vec<WorkflowRun>>) -> Self {
      Self {
        responses: RefCell::new(responses.into_iter().map(Ok).collect()),
        ..Default::default()
      }
    }
  }

  impl ReleaseHost for ScriptedHost {
    fn list_workflow_runs(&self, _: &str, _: &str, _: Option<&str>) -> PublishResult<Vec<WorkflowRun>> {
      *self.polls.borrow_mut() += 1;
      let mut responses = self.responses.borrow_mut();
      if responses.len() > 1 {
        return responses.pop_front().unwrap_or_else(|| Ok(vec![]));
      }
      match responses.front() {
        Some(Ok(runs)) => Ok(runs.clone()),
        Some(Err(e)) => Err(PublishError::message(e.to_string())),
        None => Ok(vec![]),
      }
    }

    fn find_release(&self, _: &str, _: &str, tag: &str) -> PublishResult<Option<Release>> {
      Ok(self.existing_release.clone().filter(|r| r.tag_name == tag))
    }

    fn create_release(&self, _: &str, _: &str, release: &NewRelease) -> PublishResult<Release> {
      self.releases.borrow_mut().push(release.clone());
      Ok(Release {
        id: 1,
        tag_name: release.tag_name.clone(),
        name: Some(release.name.clone()),
        prerelease: release.prerelease,
        html_url: None,
      })
    }
  }

  pub(crate) fn run(id: u64, sha: &str, event: &str, status: RunStatus, conclusion: Option<&str>) -> WorkflowRun {
    WorkflowRun {
      id,
      status,
      conclusion: conclusion.map(str::to_string),
      head_branch: Some("main".to_string()),
      head_sha: sha.to_string(),
      event: event.to_string(),
      name: Some("CI".to_string()),
    }
  }

  fn limits(start: u32, completion: u32) -> PollLimits {
    PollLimits {
      interval: Duration::ZERO,
      start_attempts: start,
      completion_attempts: completion,
    }
  }

  fn validate(host: &ScriptedHost, start: u32, completion: u32, kind: TriggerKind) -> Result<(), WorkflowError> {
    WorkflowValidator::new(host, limits(start, completion)).validate("org", "lib", "abc", kind)
  }

  #[test]
  fn test_success_after_running() {
    let host = ScriptedHost::new(vec![
      vec![],
      vec![run(1, "abc", "push", RunStatus::Queued, None)],
      vec![run(1, "abc", "push", RunStatus::InProgress, None)],
      vec![run(1, "abc", "push", RunStatus::Completed, Some("success"))],
    ]);
    assert_eq!(validate(&host, 10, 30, TriggerKind::Push), Ok(()));
    assert_eq!(*host.polls.borrow(), 4);
  }

  #[test]
  fn test_failed_conclusion_is_surfaced() {
    let host = ScriptedHost::new(vec![
      vec![run(7, "abc", "push", RunStatus::InProgress, None)],
      vec![run(7, "abc", "push", RunStatus::Completed, Some("cancelled"))],
    ]);
    let err = validate(&host, 10, 30, TriggerKind::Push).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::Failed {
        repository: "org/lib".to_string(),
        run_id: 7,
        conclusion: "cancelled".to_string(),
      }
    );
  }

  #[test]
  fn test_parallel_runs_in_one_response() {
    let host = ScriptedHost::new(vec![vec![
      run(1, "abc", "push", RunStatus::InProgress, None),
      run(2, "abc", "push", RunStatus::Queued, None),
    ]]);
    let err = validate(&host, 10, 30, TriggerKind::Push).unwrap_err();
    assert!(matches!(err, WorkflowError::ParallelRuns { ref run_ids, .. } if run_ids == &vec![1, 2]));
  }

  #[test]
  fn test_parallel_run_appearing_later_never_reports_success() {
    let host = ScriptedHost::new(vec![
      vec![run(1, "abc", "push", RunStatus::InProgress, None)],
      vec![
        run(1, "abc", "push", RunStatus::Completed, Some("success")),
        run(2, "abc", "push", RunStatus::InProgress, None),
      ],
    ]);
    let err = validate(&host, 10, 30, TriggerKind::Push).unwrap_err();
    assert!(matches!(err, WorkflowError::ParallelRuns { .. }));
  }

  #[test]
  fn test_never_started_after_start_attempts() {
    let host = ScriptedHost::new(vec![vec![]]);
    let err = validate(&host, 10, 30, TriggerKind::Push).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::NeverStarted {
        repository: "org/lib".to_string(),
        sha: "abc".to_string(),
        attempts: 10,
      }
    );
    assert_eq!(*host.polls.borrow(), 10);
  }

  #[test]
  fn test_timeout_while_running() {
    let host = ScriptedHost::new(vec![vec![run(3, "abc", "push", RunStatus::InProgress, None)]]);
    let err = validate(&host, 2, 5, TriggerKind::Push).unwrap_err();
    assert_eq!(
      err,
      WorkflowError::TimedOut {
        repository: "org/lib".to_string(),
        run_id: 3,
        attempts: 5,
      }
    );
  }

  #[test]
  fn test_runs_for_other_commits_and_events_are_ignored() {
    let host = ScriptedHost::new(vec![
      vec![
        run(1, "abc", "push", RunStatus::Completed, Some("success")),
        run(2, "def", "release", RunStatus::InProgress, None),
      ],
      vec![
        run(1, "abc", "push", RunStatus::Completed, Some("success")),
        run(3, "abc", "release", RunStatus::InProgress, None),
      ],
      vec![
        run(1, "abc", "push", RunStatus::Completed, Some("success")),
        run(3, "abc", "release", RunStatus::Completed, Some("failure")),
      ],
    ]);
    let err = validate(&host, 10, 30, TriggerKind::Release).unwrap_err();
    assert!(matches!(err, WorkflowError::Failed { run_id: 3, .. }));
  }

  #[test]
  fn test_already_completed_run_is_accepted() {
    let host = ScriptedHost::new(vec![vec![
      run(4, "abc", "push", RunStatus::Completed, Some("failure")),
      run(9, "abc", "push", RunStatus::Completed, Some("success")),
    ]]);
    assert_eq!(validate(&host, 10, 30, TriggerKind::Push), Ok(()));
    assert_eq!(*host.polls.borrow(), 1);
  }

  #[test]
  fn test_query_error_is_fatal() {
    let host = ScriptedHost::default();
    host
      .responses
      .borrow_mut()
      .push_back(Err(PublishError::message("HTTP 500")));
    let err = validate(&host, 10, 30, TriggerKind::Push).unwrap_err();
    assert!(matches!(err, WorkflowError::Query { .. }));
  }

  #[test]
  fn test_session_locks_first_unfinished_run() {
    let mut session = ValidationSession::new("org/lib", "abc", TriggerKind::Push);
    assert_eq!(session.observe(&[]), Observation::Pending);
    assert_eq!(session.locked_run(), None);
    assert_eq!(
      session.observe(&[run(5, "abc", "push", RunStatus::Queued, None)]),
      Observation::Pending
    );
    assert_eq!(session.locked_run(), Some(5));
    assert_eq!(session.attempts(), 2);
  }
}
