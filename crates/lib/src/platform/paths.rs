use crate::consts::{APP_NAME, CACHE_DIR_ENV};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Returns the root of the dependency cache.
///
/// `SUBSTRATE_CACHE_DIR` wins over the platform default. When no home
/// directory can be determined the system temp directory is used.
pub fn cache_dir() -> PathBuf {
  if let Some(path) = std::env::var_os(CACHE_DIR_ENV) {
    return PathBuf::from(path);
  }

  default_cache_dir().unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
}

#[cfg(windows)]
fn default_cache_dir() -> Option<PathBuf> {
  std::env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join(APP_NAME).join("Cache"))
}

#[cfg(not(windows))]
fn default_cache_dir() -> Option<PathBuf> {
  let cache_home = std::env::var_os("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .or_else(|| home_dir().map(|home| home.join(".cache")))?;
  Some(cache_home.join(APP_NAME))
}
