//! package.json version rewrite
//!
//! Sets `version` and points every organization-scoped dependency at
//! `^<version>`. Keys keep their order, unrelated entries keep their values and
//! the file keeps its indentation, so the diff is limited to the lines that had
//! to change. String escapes are not preserved: `\u00e9` is written back as `é`.

use crate::core::error::{PublishError, PublishResult, ResultExt};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "package.json";

/// Dependency tables whose organization entries follow the release version
const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

/// Rewrite a manifest document in memory
///
/// Returns the names of the dependencies that were rewritten.
pub fn apply_version(manifest: &mut Value, version: &str, prefix: &str) -> PublishResult<Vec<String>> {
  let object = manifest
    .as_object_mut()
    .ok_or_else(|| PublishError::message("package.json must contain a JSON object"))?;

  object.insert("version".to_string(), Value::String(version.to_string()));

  let constraint = format!("^{}", version);
  let mut rewritten = Vec::new();

  for table in DEPENDENCY_TABLES {
    let Some(deps) = object.get_mut(table).and_then(Value::as_object_mut) else {
      continue;
    };
    for (name, spec) in deps.iter_mut() {
      if name.starts_with(prefix) {
        *spec = Value::String(constraint.clone());
        rewritten.push(name.clone());
      }
    }
  }

  Ok(rewritten)
}

const DEFAULT_INDENT: &str = "  ";

/// Indentation unit of an existing document (two spaces for minified input)
pub fn detect_indent(content: &str) -> &str {
  content
    .lines()
    .skip(1)
    .find_map(|line| {
      let rest = line.trim_start_matches([' ', '\t']);
      let indent = &line[..line.len() - rest.len()];
      (!indent.is_empty() && !rest.is_empty()).then_some(indent)
    })
    .unwrap_or(DEFAULT_INDENT)
}

/// Render with the given indentation and a trailing newline
pub fn render(manifest: &Value, indent: &str) -> PublishResult<String> {
  let mut buf = Vec::new();
  let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
  manifest.serialize(&mut serializer)?;

  let mut content =
    String::from_utf8(buf).map_err(|e| PublishError::message(format!("Rendered manifest is not UTF-8: {}", e)))?;
  content.push('\n');
  Ok(content)
}

/// Update `<dir>/package.json` on disk
pub fn update_manifest(dir: &Path, version: &str, prefix: &str) -> PublishResult<Vec<String>> {
  let path = dir.join(MANIFEST_FILE);
  let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  let mut manifest: Value =
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

  if manifest.get("version").and_then(Value::as_str).is_none() {
    return Err(PublishError::message(format!(
      "{} has no string `version` field",
      path.display()
    )));
  }

  let rewritten = apply_version(&mut manifest, version, prefix)?;
  fs::write(&path, render(&manifest, detect_indent(&content))?).with_context(|| format!("Failed to write {}", path.display()))?;
  Ok(rewritten)
}
