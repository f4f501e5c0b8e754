//! Hosted release naming

use crate::utils::capitalize;
use semver::Version;

/// Human-readable release title
///
/// Stable versions read `Release 2.1.0`; pre-releases lead with their
/// capitalized label: `2.1.0-beta` becomes `Beta release 2.1.0`.
pub fn release_title(version: &Version) -> String {
  let base = format!("{}.{}.{}", version.major, version.minor, version.patch);
  if version.pre.is_empty() {
    format!("Release {}", base)
  } else {
    format!("{} release {}", capitalize(version.pre.as_str()), base)
  }
}
