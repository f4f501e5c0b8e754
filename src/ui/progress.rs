//! Progress indicators for release steps
//!
//! Uses `linya` for allocation-free progress bars drawn to stderr.

use linya::{Bar, Progress};

/// One bar per repository, ticked once per finished step
pub struct StepProgress {
  progress: Progress,
  bar: Bar,
}

impl StepProgress {
  /// Create a bar for `total` steps, starting at `done`
  pub fn new(total: usize, done: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    if done > 0 {
      progress.set_and_draw(&bar, done);
    }
    Self { progress, bar }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}
