//! ZIP extraction for bundle archives.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::cache::CacheError;
use crate::cache::checksum::path_to_key;

/// Extract every entry of the archive at `archive_path` into `dest`.
///
/// Intermediate directories are created as needed. Entries whose names would
/// escape `dest` are rejected. Returns the checksum-map keys of all extracted
/// regular files.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<Vec<String>, CacheError> {
  let archive_err = |message: String| CacheError::Archive {
    path: archive_path.to_path_buf(),
    message,
  };

  let file = File::open(archive_path).map_err(|source| CacheError::Io {
    path: archive_path.to_path_buf(),
    source,
  })?;
  let mut archive =
    zip::ZipArchive::new(BufReader::new(file)).map_err(|e| archive_err(format!("failed to open zip: {}", e)))?;

  fs::create_dir_all(dest).map_err(|source| CacheError::Io {
    path: dest.to_path_buf(),
    source,
  })?;

  let mut extracted = Vec::new();
  for i in 0..archive.len() {
    let mut entry = archive
      .by_index(i)
      .map_err(|e| archive_err(format!("failed to read zip entry: {}", e)))?;

    let relative = entry
      .enclosed_name()
      .ok_or_else(|| CacheError::UnsafeEntry(entry.name().to_string()))?;
    if relative.as_os_str().is_empty() {
      continue;
    }
    let dest_path = dest.join(&relative);
    let io_err = |source| CacheError::Io {
      path: dest_path.clone(),
      source,
    };

    if entry.is_dir() {
      fs::create_dir_all(&dest_path).map_err(io_err)?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut outfile = File::create(&dest_path).map_err(io_err)?;
    std::io::copy(&mut entry, &mut outfile).map_err(io_err)?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(io_err)?;
      }
    }

    extracted.push(path_to_key(&relative));
  }

  debug!(archive = ?archive_path, dest = ?dest, files = extracted.len(), "extracted archive");
  Ok(extracted)
}
