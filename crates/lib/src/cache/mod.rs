//! Verify-then-fetch cache for the static-library bundles a build needs.
//!
//! A bundle version lives in `<cache_root>/<folder>/<version>/`. It is usable
//! when every expected file exists and, with hash verification on, each file's
//! digest matches the checksum map written after the last successful
//! extraction. Anything else triggers a full re-download.

pub mod bundle;
pub mod checksum;
pub mod extract;
pub mod fetch;
pub mod lock;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProjectConfiguration;
use crate::platform::Os;
use crate::util::hash::hash_file;

pub use bundle::{BundleDescriptor, JAVA_STATIC_SDK_FOLDER, JAVAFX_STATIC_SDK_FOLDER};
pub use checksum::{ChecksumError, ChecksumMap};
pub use lock::{CacheLock, CacheLockError};

use checksum::key_to_path;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to download {url}: {message}")]
  Download { url: String, message: String },

  #[error("invalid archive {}: {message}", path.display())]
  Archive { path: PathBuf, message: String },

  #[error("archive entry escapes the extraction directory: {0}")]
  UnsafeEntry(String),

  #[error("archive from {url} is missing expected files: {}", missing.join(", "))]
  IncompleteBundle { url: String, missing: Vec<String> },

  #[error(transparent)]
  Checksum(#[from] ChecksumError),

  #[error(transparent)]
  Lock(#[from] CacheLockError),

  #[error("cache task failed: {0}")]
  Task(String),
}

/// Why a cached bundle cannot be used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
  MissingDirectory,
  EmptyDirectory,
  MissingFile(String),
  MissingChecksumMap,
  /// The map exists but has no entry for an expected file.
  UnlistedFile(String),
  DigestMismatch(String),
}

impl fmt::Display for StaleReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StaleReason::MissingDirectory => write!(f, "version directory missing"),
      StaleReason::EmptyDirectory => write!(f, "version directory empty"),
      StaleReason::MissingFile(key) => write!(f, "missing file {}", key),
      StaleReason::MissingChecksumMap => write!(f, "checksum map missing"),
      StaleReason::UnlistedFile(key) => write!(f, "no checksum recorded for {}", key),
      StaleReason::DigestMismatch(key) => write!(f, "checksum mismatch for {}", key),
    }
  }
}

/// Outcome of [`DependencyCache::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
  /// The local copy was valid; no network access happened.
  Cached,
  Downloaded,
}

/// Bundle cache rooted at a single directory.
#[derive(Debug, Clone)]
pub struct DependencyCache {
  root: PathBuf,
  client: reqwest::Client,
}

impl DependencyCache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self::with_client(root, reqwest::Client::new())
  }

  pub fn with_client(root: impl Into<PathBuf>, client: reqwest::Client) -> Self {
    Self {
      root: root.into(),
      client,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Check the local copy of `bundle` without touching the network.
  ///
  /// Returns `None` when the bundle is usable.
  pub fn stale_reason(&self, bundle: &BundleDescriptor, target: Os, verify: bool) -> Option<StaleReason> {
    let version_dir = bundle.version_dir(&self.root);
    if !version_dir.is_dir() {
      return Some(StaleReason::MissingDirectory);
    }
    match fs::read_dir(&version_dir) {
      Ok(mut entries) => {
        if entries.next().is_none() {
          return Some(StaleReason::EmptyDirectory);
        }
      }
      Err(_) => return Some(StaleReason::MissingDirectory),
    }

    let keys = bundle.expected_keys(target);
    if let Some(key) = keys.iter().find(|key| !key_to_path(&version_dir, key).is_file()) {
      return Some(StaleReason::MissingFile(key.clone()));
    }

    if !verify {
      return None;
    }

    let Some(map) = ChecksumMap::load(&bundle.checksum_map_path(&self.root, target)) else {
      return Some(StaleReason::MissingChecksumMap);
    };
    for key in &keys {
      let Some(stored) = map.get(key) else {
        return Some(StaleReason::UnlistedFile(key.clone()));
      };
      match hash_file(&key_to_path(&version_dir, key)) {
        Ok(actual) if actual == *stored => {}
        Ok(_) => return Some(StaleReason::DigestMismatch(key.clone())),
        Err(e) => {
          debug!(key = %key, error = %e, "cached file not readable");
          return Some(StaleReason::MissingFile(key.clone()));
        }
      }
    }
    None
  }

  /// Make sure `bundle` is present and valid for `target`, downloading it if not.
  ///
  /// Population is serialized across processes by the bundle's lock file; the
  /// state is checked again once the lock is held so a bundle populated by a
  /// concurrent build is not fetched twice.
  pub async fn ensure(&self, bundle: &BundleDescriptor, target: Os, verify: bool) -> Result<Ensured, CacheError> {
    let Some(reason) = self.check(bundle, target, verify).await? else {
      debug!(folder = %bundle.folder, version = %bundle.version, "bundle up to date");
      return Ok(Ensured::Cached);
    };

    let lock_path = bundle.lock_path(&self.root);
    let _lock = CacheLock::acquire(&lock_path, &format!("populate {} {}", bundle.folder, bundle.version)).await?;

    if self.check(bundle, target, verify).await?.is_none() {
      debug!(folder = %bundle.folder, version = %bundle.version, "bundle populated by another process");
      return Ok(Ensured::Cached);
    }

    info!(folder = %bundle.folder, version = %bundle.version, reason = %reason, "refreshing bundle");
    self.refresh(bundle, target).await?;
    Ok(Ensured::Downloaded)
  }

  async fn check(&self, bundle: &BundleDescriptor, target: Os, verify: bool) -> Result<Option<StaleReason>, CacheError> {
    let cache = self.clone();
    let bundle = bundle.clone();
    tokio::task::spawn_blocking(move || cache.stale_reason(&bundle, target, verify))
      .await
      .map_err(|e| CacheError::Task(e.to_string()))
  }

  /// Download, extract and re-hash the bundle unconditionally.
  pub async fn refresh(&self, bundle: &BundleDescriptor, target: Os) -> Result<ChecksumMap, CacheError> {
    let folder_dir = bundle.folder_dir(&self.root);
    tokio::fs::create_dir_all(&folder_dir).await.map_err(|source| CacheError::Io {
      path: folder_dir.clone(),
      source,
    })?;

    let url = bundle.url(target);
    let archive = tempfile::Builder::new()
      .prefix(".download-")
      .suffix(".zip")
      .tempfile_in(&self.root)
      .map_err(|source| CacheError::Io {
        path: self.root.clone(),
        source,
      })?
      .into_temp_path();
    fetch::download(&self.client, &url, &archive).await?;

    let install = Install {
      url,
      folder_dir,
      version_dir: bundle.version_dir(&self.root),
      map_path: bundle.checksum_map_path(&self.root, target),
      expected: bundle.expected_keys(target),
    };
    // The archive's TempPath is dropped with the closure, deleting it on every path.
    let map = tokio::task::spawn_blocking(move || install.run(&archive))
      .await
      .map_err(|e| CacheError::Task(e.to_string()))??;

    info!(folder = %bundle.folder, version = %bundle.version, files = map.len(), "bundle installed");
    Ok(map)
  }
}

/// Blocking half of a refresh: extract, move into place, hash.
struct Install {
  url: String,
  folder_dir: PathBuf,
  version_dir: PathBuf,
  map_path: PathBuf,
  expected: Vec<String>,
}

impl Install {
  fn run(self, archive: &Path) -> Result<ChecksumMap, CacheError> {
    let staging = tempfile::Builder::new()
      .prefix(".staging-")
      .tempdir_in(&self.folder_dir)
      .map_err(|source| CacheError::Io {
        path: self.folder_dir.clone(),
        source,
      })?;

    let mut keys = extract::extract_zip(archive, staging.path())?;
    let missing: Vec<String> = self.expected.iter().filter(|k| !keys.contains(k)).cloned().collect();
    if !missing.is_empty() {
      return Err(CacheError::IncompleteBundle { url: self.url, missing });
    }

    // Without a map the bundle reads as stale until the new one is saved.
    remove_path(&self.map_path)?;

    // The staged tree replaces the version directory whole, so entries the
    // new archive no longer ships do not survive the refresh.
    remove_path(&self.version_dir)?;
    fs::rename(staging.path(), &self.version_dir).map_err(|source| CacheError::Io {
      path: self.version_dir.clone(),
      source,
    })?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      fs::set_permissions(&self.version_dir, fs::Permissions::from_mode(0o755)).map_err(|source| {
        CacheError::Io {
          path: self.version_dir.clone(),
          source,
        }
      })?;
    }

    keys.sort();
    let map = ChecksumMap::compute(&self.version_dir, &keys)?;
    map.save(&self.map_path)?;
    Ok(map)
  }
}

/// Remove a file or directory tree if it exists.
fn remove_path(path: &Path) -> Result<(), CacheError> {
  let result = match fs::symlink_metadata(path) {
    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
    Ok(_) => fs::remove_file(path),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(e),
  };
  result.map_err(|source| CacheError::Io {
    path: path.to_path_buf(),
    source,
  })
}

/// Bundles the configuration needs fetched into the cache.
///
/// A bundle whose root the configuration overrides is used as-is and never
/// downloaded into.
pub fn required_bundles(config: &ProjectConfiguration) -> Vec<BundleDescriptor> {
  let mut bundles = Vec::new();
  if config.use_jni {
    match &config.static_root {
      Some(root) => debug!(path = ?root, "using configured Java static libraries"),
      None => bundles.push(BundleDescriptor::java_static_sdk(config)),
    }
  }
  if config.use_javafx {
    match &config.javafx_root {
      Some(root) => debug!(path = ?root, "using configured JavaFX SDK"),
      None => bundles.push(BundleDescriptor::javafx_static_sdk(config)),
    }
  }
  bundles
}

/// Ensure a single bundle in the configured cache.
pub async fn ensure(bundle: &BundleDescriptor, config: &ProjectConfiguration) -> Result<Ensured, CacheError> {
  DependencyCache::new(&config.cache_root)
    .ensure(bundle, config.target.os, config.enable_check_hash)
    .await
}

/// Ensure every bundle the configuration requires.
pub async fn setup_dependencies(config: &ProjectConfiguration) -> Result<(), CacheError> {
  let cache = DependencyCache::new(&config.cache_root);
  for bundle in required_bundles(config) {
    cache
      .ensure(&bundle, config.target.os, config.enable_check_hash)
      .await?;
  }
  Ok(())
}
