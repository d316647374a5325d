//! Persisted file → digest maps for cached bundles.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::util::hash::{ContentHash, hash_file};

#[derive(Debug, Error)]
pub enum ChecksumError {
  #[error("failed to hash {}: {source}", path.display())]
  Hash { path: PathBuf, source: std::io::Error },

  #[error("failed to write checksum map {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("failed to serialize checksum map: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Mapping from a file's `/`-separated path (relative to the bundle's version
/// directory) to its digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumMap(BTreeMap<String, ContentHash>);

impl ChecksumMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, hash: ContentHash) {
    self.0.insert(key.into(), hash);
  }

  pub fn get(&self, key: &str) -> Option<&ContentHash> {
    self.0.get(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &ContentHash)> {
    self.0.iter()
  }

  /// Digest every file in `keys`, resolved against `root`.
  pub fn compute<S: AsRef<str>>(root: &Path, keys: &[S]) -> Result<Self, ChecksumError> {
    let mut map = Self::new();
    for key in keys {
      let key = key.as_ref();
      let path = key_to_path(root, key);
      let hash = hash_file(&path).map_err(|source| ChecksumError::Hash { path, source })?;
      map.insert(key, hash);
    }
    Ok(map)
  }

  /// Load a persisted map.
  ///
  /// A missing or unreadable map is reported as `None`: callers treat it as
  /// "refresh the bundle", never as a failure.
  pub fn load(path: &Path) -> Option<Self> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) => {
        debug!(path = ?path, error = %e, "checksum map not readable");
        return None;
      }
    };
    match serde_json::from_str(&content) {
      Ok(map) => Some(map),
      Err(e) => {
        debug!(path = ?path, error = %e, "checksum map not parseable");
        None
      }
    }
  }

  /// Persist the map, replacing any previous one.
  ///
  /// The content goes to a sibling temporary file that is then renamed over
  /// `path`, so readers see either the old map or the complete new one.
  pub fn save(&self, path: &Path) -> Result<(), ChecksumError> {
    let write_err = |source| ChecksumError::Write {
      path: path.to_path_buf(),
      source,
    };
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(write_err)?;

    let content = serde_json::to_string_pretty(self)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
  }
}

/// Turn a relative filesystem path into a checksum-map key.
pub fn path_to_key(relative: &Path) -> String {
  relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

/// Resolve a checksum-map key against `root`.
pub fn key_to_path(root: &Path, key: &str) -> PathBuf {
  key
    .split('/')
    .filter(|part| !part.is_empty())
    .fold(root.to_path_buf(), |path, part| path.join(part))
}
