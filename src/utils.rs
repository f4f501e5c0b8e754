//! Utility functions for remote URLs and release naming

/// Split an `owner/repo` slug into its parts
///
/// Returns None unless there are exactly two non-empty segments.
pub fn split_slug(slug: &str) -> Option<(&str, &str)> {
  let (owner, repo) = slug.split_once('/')?;
  if owner.is_empty() || repo.is_empty() || repo.contains('/') {
    return None;
  }
  Some((owner, repo))
}

/// Extract the GitHub `owner/repo` slug from a remote URL
///
/// Handles:
/// - SSH URLs: git@github.com:owner/repo.git
/// - SSH scheme URLs: ssh://git@github.com/owner/repo.git
/// - HTTPS URLs: <https://github.com/owner/repo> (with or without `.git`)
///
/// Returns None for local paths and non-GitHub hosts.
pub fn github_slug_from_url(url: &str) -> Option<String> {
  let url = url.trim();

  let path = if let Some(rest) = url.strip_prefix("git@github.com:") {
    rest
  } else if let Some((_, rest)) = url.split_once("github.com/") {
    // Matches https://, ssh://git@ and https://user@ forms
    if !url.contains("://") {
      return None;
    }
    rest
  } else {
    return None;
  };

  let path = path.trim_end_matches('/');
  let path = path.strip_suffix(".git").unwrap_or(path);
  split_slug(path).map(|(owner, repo)| format!("{}/{}", owner, repo))
}

/// Upper-case the first character of a string
pub fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
