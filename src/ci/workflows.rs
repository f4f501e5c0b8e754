//! GitHub Actions trigger discovery
//!
//! Only two questions matter here: does any workflow run on a push to the
//! release branch, and does any workflow run when a release is published.
//! Both are answered from `.github/workflows/*.yml` without evaluating
//! anything else in the files.

use crate::core::error::{PublishResult, ResultExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Which validation steps a repository's CI declarations call for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
  /// A workflow runs on push to the release branch
  pub push: bool,
  /// A workflow runs when a release is published
  pub release_published: bool,
}

impl Triggers {
  fn merge(self, other: Triggers) -> Triggers {
    Triggers {
      push: self.push || other.push,
      release_published: self.release_published || other.release_published,
    }
  }
}

#[derive(Debug, Deserialize)]
struct WorkflowFile {
  #[serde(default)]
  on: Option<OnSpec>,
}

/// The `on:` key accepts an event name, a list of names, or a map of filters
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OnSpec {
  Event(String),
  Events(Vec<String>),
  Filters(BTreeMap<String, serde_yaml::Value>),
}

/// String list under `key` in an event's filter map, if the filter is present
///
/// Events such as `schedule` carry sequences instead of maps; they have no filters.
fn filter_list(filter: &serde_yaml::Value, key: &str) -> Option<Vec<String>> {
  let list = filter.get(key)?.as_sequence()?;
  Some(list.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

/// Triggers declared by one workflow document
pub fn parse_triggers(yaml: &str, branch: &str) -> PublishResult<Triggers> {
  let file: WorkflowFile = serde_yaml::from_str(yaml)?;

  let triggers = match file.on {
    None => Triggers::default(),
    Some(OnSpec::Event(event)) => event_without_filter(&event),
    Some(OnSpec::Events(events)) => events
      .iter()
      .map(|e| event_without_filter(e))
      .fold(Triggers::default(), Triggers::merge),
    Some(OnSpec::Filters(map)) => {
      let push = map.get("push").map(|filter| match filter_list(filter, "branches") {
        Some(branches) => branches.iter().any(|b| b == branch),
        None => true,
      });
      let release = map.get("release").map(|filter| match filter_list(filter, "types") {
        Some(types) => types.iter().any(|t| t == "published"),
        None => true,
      });
      Triggers {
        push: push.unwrap_or(false),
        release_published: release.unwrap_or(false),
      }
    }
  };

  Ok(triggers)
}

/// An event listed without filters fires for every branch / release type
fn event_without_filter(event: &str) -> Triggers {
  Triggers {
    push: event == "push",
    release_published: event == "release",
  }
}

/// Combined triggers of every workflow in a repository
///
/// A repository without a workflows directory declares nothing.
pub fn discover_triggers(repo_root: &Path, branch: &str) -> PublishResult<Triggers> {
  let dir = repo_root.join(WORKFLOWS_DIR);
  if !dir.is_dir() {
    return Ok(Triggers::default());
  }

  let mut paths: Vec<_> = fs::read_dir(&dir)
    .with_context(|| format!("Failed to list {}", dir.display()))?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yml" | "yaml")))
    .collect();
  paths.sort();

  let mut triggers = Triggers::default();
  for path in paths {
    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let found = parse_triggers(&content, branch).with_context(|| format!("Invalid workflow {}", path.display()))?;
    triggers = triggers.merge(found);
  }

  Ok(triggers)
}
