//! Resumable step sequencer
//!
//! Runs the fixed step list against one repository at a time and keeps the
//! progress file in lockstep with execution:
//!
//! ```text
//! record(repo, step)   -> durable write #1 (a crash now resumes at `step`)
//! run_step(step)
//!   ok  -> remove(repo)  -> durable write #2
//!   err -> persist()     -> marker stays, error aborts the whole run
//! record(repo, "complete") after the last step
//! reset() once every repository is complete
//! ```
//!
//! A resumed repository re-enters at the recorded step and never re-runs the
//! steps before it. The recorded step itself runs again, which is why every
//! step must tolerate having already taken effect.

use crate::core::error::{PreconditionError, PublishError, PublishResult};
use crate::publish::step::StepId;
use crate::state::{COMPLETE_MARKER, ProgressStore};
use crate::ui::StepProgress;

/// Per-repository side of the sequencer: preconditions and step bodies
pub trait StepRunner {
  /// Checks run before the first step of this invocation
  ///
  /// `resuming` is true when a marker was found for the repository.
  fn check_preconditions(&mut self, resuming: bool) -> PublishResult<()>;

  /// Execute one step
  fn run_step(&mut self, step: StepId) -> PublishResult<()>;
}

/// Where a repository stands according to the progress file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
  /// No marker: start at the first step
  Fresh,
  /// Marker names the step at this index
  At(usize),
  /// Every step already succeeded in this run
  Complete,
}

impl Cursor {
  /// Interpret a repository's marker against the step list
  pub fn resolve(repository: &str, marker: Option<&str>, steps: &[StepId]) -> PublishResult<Self> {
    let Some(marker) = marker else {
      return Ok(Cursor::Fresh);
    };

    if marker == COMPLETE_MARKER {
      return Ok(Cursor::Complete);
    }

    steps
      .iter()
      .position(|step| step.name() == marker)
      .map(Cursor::At)
      .ok_or_else(|| {
        PublishError::Precondition(PreconditionError::UnknownStep {
          repository: repository.to_string(),
          marker: marker.to_string(),
        })
      })
  }
}

/// How a repository's sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
  /// Steps ran to the end during this invocation
  Published,
  /// Marked complete by an earlier invocation
  AlreadyComplete,
}

pub struct Sequencer<'a> {
  store: &'a mut ProgressStore,
  steps: &'a [StepId],
  show_progress: bool,
}

impl<'a> Sequencer<'a> {
  pub fn new(store: &'a mut ProgressStore, steps: &'a [StepId]) -> Self {
    Self {
      store,
      steps,
      show_progress: false,
    }
  }

  /// Draw a progress bar per repository
  pub fn with_progress(mut self, show: bool) -> Self {
    self.show_progress = show;
    self
  }

  /// Run every step of one repository, resuming from its marker
  pub fn run_sequence<R: StepRunner + ?Sized>(
    &mut self,
    repository: &str,
    runner: &mut R,
  ) -> PublishResult<SequenceOutcome> {
    let start = match Cursor::resolve(repository, self.store.marker(repository), self.steps)? {
      Cursor::Complete => {
        println!("⏭️  {} already published, skipping", repository);
        return Ok(SequenceOutcome::AlreadyComplete);
      }
      Cursor::Fresh => {
        runner.check_preconditions(false)?;
        println!("📦 Publishing {}", repository);
        0
      }
      Cursor::At(index) => {
        runner.check_preconditions(true)?;
        println!("📦 Resuming {} at step '{}'", repository, self.steps[index]);
        index
      }
    };

    let mut progress = self
      .show_progress
      .then(|| StepProgress::new(self.steps.len(), start, repository.to_string()));

    for &step in &self.steps[start..] {
      self.store.record(repository, step.name())?;

      if let Err(err) = runner.run_step(step) {
        // The marker is already on disk; write once more so the failure is the last transition recorded
        let failure = PublishError::step(repository, step.name(), err);
        return Err(match self.store.persist() {
          Ok(()) => failure,
          Err(persist_err) => failure.context(format!(
            "⚠️  Progress file {} may be stale: {}",
            self.store.path().display(),
            persist_err
          )),
        });
      }

      self.store.remove(repository)?;
      if let Some(bar) = progress.as_mut() {
        bar.inc();
      }
    }

    self.store.record(repository, COMPLETE_MARKER)?;
    println!("✅ {} published", repository);
    Ok(SequenceOutcome::Published)
  }

  /// Run every repository in order, then clear the store
  ///
  /// The first failure aborts the run; later repositories are not touched.
  pub fn run_all<R, F>(&mut self, repositories: &[&str], mut make_runner: F) -> PublishResult<()>
  where
    R: StepRunner,
    F: FnMut(&str) -> PublishResult<R>,
  {
    for repository in repositories {
      // Completed repositories are skipped without opening them
      if self.store.marker(repository) == Some(COMPLETE_MARKER) {
        println!("⏭️  {} already published, skipping", repository);
        continue;
      }

      let mut runner = make_runner(repository)?;
      self.run_sequence(repository, &mut runner)?;
    }

    self.store.reset()
  }
}
