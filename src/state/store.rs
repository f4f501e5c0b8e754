//! Persisted progress markers
//!
//! The progress file maps a repository name to the step it was last recorded
//! at (or to the completion sentinel). It is the only mutable state shared
//! between runs of the tool:
//!
//! ```json
//! {
//!   "lib": "push"
//! }
//! ```
//!
//! Every mutation goes through [`ProgressStore::persist`], which rewrites the
//! whole file durably. There is no batching: one transition, one write.

use crate::core::error::{PublishError, PublishResult, ResultExt};
use crate::state::fsync::write_durable;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Marker value recording that a repository finished every step
pub const COMPLETE_MARKER: &str = "complete";

#[derive(Debug)]
pub struct ProgressStore {
  path: PathBuf,
  entries: BTreeMap<String, String>,
  writes: usize,
}

impl ProgressStore {
  /// Load the store, treating a missing file as empty
  ///
  /// `null` values are accepted and read as absent entries.
  pub fn load(path: &Path) -> PublishResult<Self> {
    let mut entries = BTreeMap::new();

    if path.exists() {
      let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read progress file {}", path.display()))?;

      if !content.trim().is_empty() {
        let raw: BTreeMap<String, Option<String>> = serde_json::from_str(&content).map_err(|e| {
          PublishError::with_help(
            format!("Progress file {} is not a JSON object of step names: {}", path.display(), e),
            "Fix the file by hand or run `release-rail reset` to start over.",
          )
        })?;
        entries.extend(raw.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
      }
    }

    Ok(Self {
      path: path.to_path_buf(),
      entries,
      writes: 0,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Marker recorded for a repository
  pub fn marker(&self, repository: &str) -> Option<&str> {
    self.entries.get(repository).map(String::as_str)
  }

  /// All recorded markers, ordered by repository name
  pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Number of durable writes performed through this handle
  #[allow(dead_code)] // Used in tests to count durable writes
  pub fn writes(&self) -> usize {
    self.writes
  }

  /// Record `marker` for a repository and persist
  pub fn record(&mut self, repository: &str, marker: &str) -> PublishResult<()> {
    self.entries.insert(repository.to_string(), marker.to_string());
    self.persist()
  }

  /// Remove a repository's marker and persist
  pub fn remove(&mut self, repository: &str) -> PublishResult<()> {
    self.entries.remove(repository);
    self.persist()
  }

  /// Drop every marker and persist an empty store
  pub fn reset(&mut self) -> PublishResult<()> {
    self.entries.clear();
    self.persist()
  }

  /// Write the current entries to disk (2-space indent, trailing newline)
  pub fn persist(&mut self) -> PublishResult<()> {
    let mut content = serde_json::to_string_pretty(&self.entries)?;
    content.push('\n');

    write_durable(&self.path, content.as_bytes())
      .with_context(|| format!("Failed to write progress file {}", self.path.display()))?;
    self.writes += 1;
    Ok(())
  }
}
