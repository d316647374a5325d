//! Content digests for cache-corruption detection.
//!
//! Digests only need to notice drift between what was extracted and what is on
//! disk now, so a fast non-cryptographic hash (MD5) is used rather than SHA-2.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::DIGEST_BUFFER_SIZE;

/// A 32-character lowercase hexadecimal MD5 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents, streaming it in fixed-size blocks.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut context = md5::Context::new();
  let mut buffer = [0u8; DIGEST_BUFFER_SIZE];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    context.consume(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", context.compute())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(format!("{:x}", md5::compute(data)))
}
