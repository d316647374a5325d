//! Bundle archive download.

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::cache::CacheError;

/// Download `url` into `dest`, writing the body chunk by chunk as it arrives
/// so memory use stays bounded regardless of archive size.
///
/// Returns the number of bytes written.
pub async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64, CacheError> {
  info!(url = %url, "downloading bundle");

  let fetch_err = |message: String| CacheError::Download {
    url: url.to_string(),
    message,
  };

  let mut response = client.get(url).send().await.map_err(|e| fetch_err(e.to_string()))?;

  if !response.status().is_success() {
    return Err(fetch_err(format!("HTTP {}", response.status())));
  }

  let io_err = |source| CacheError::Io {
    path: dest.to_path_buf(),
    source,
  };
  let mut file = fs::File::create(dest).await.map_err(io_err)?;
  let mut written = 0u64;

  while let Some(chunk) = response.chunk().await.map_err(|e| fetch_err(e.to_string()))? {
    file.write_all(&chunk).await.map_err(io_err)?;
    written += chunk.len() as u64;
  }
  file.flush().await.map_err(io_err)?;

  debug!(path = ?dest, size = written, "download complete");
  Ok(written)
}
