//! Durable file replacement
//!
//! The progress file must be on disk before the next step starts, because that
//! step may take the process down. Writes go to a sibling temp file which is
//! fsynced, renamed over the target, and followed by a directory fsync so the
//! rename itself survives a crash.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Syncs a directory to disk, ensuring directory entries are durable.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
  let dir = OpenOptions::new().read(true).open(dir_path)?;
  dir.sync_all()
}

/// Atomically replace `path` with `contents` and flush it to disk
pub fn write_durable(path: &Path, contents: &[u8]) -> io::Result<()> {
  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir)?;

  let file_name = path
    .file_name()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "progress path has no file name"))?;
  let tmp_path = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

  {
    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(contents)?;
    tmp.sync_all()?;
  }

  fs::rename(&tmp_path, path)?;

  // Directory fsync is not supported on every platform; the rename already happened.
  #[cfg(unix)]
  fsync_dir(dir)?;

  Ok(())
}
