pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arch::Arch;
pub use os::Os;

/// Errors produced while parsing platform identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
  #[error("unknown operating system: {0}")]
  UnknownOs(String),

  #[error("unknown architecture: {0}")]
  UnknownArch(String),

  #[error("invalid target triplet '{0}', expected <arch>-<os> (e.g. x86_64-linux)")]
  InvalidTriplet(String),
}

/// Compilation target combining architecture and OS (e.g., "aarch64-darwin")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Triplet {
  pub arch: Arch,
  pub os: Os,
}

impl Triplet {
  /// Create a new target triplet
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the host platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn host() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the triple string (e.g., "aarch64-darwin")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Triplet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}

impl FromStr for Triplet {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (arch, os) = s
      .split_once('-')
      .ok_or_else(|| PlatformError::InvalidTriplet(s.to_string()))?;
    Ok(Self {
      arch: arch.parse()?,
      os: os.parse()?,
    })
  }
}

impl TryFrom<String> for Triplet {
  type Error = PlatformError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Triplet> for String {
  fn from(value: Triplet) -> Self {
    value.triple()
  }
}

/// Returns the triple for the current system (e.g., "aarch64-darwin")
///
/// Returns `None` if the current platform is not supported
pub fn host_triple() -> Option<String> {
  Triplet::host().map(|t| t.triple())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn triple_format() {
    let triplet = Triplet::new(Arch::Aarch64, Os::MacOs);
    assert_eq!(triplet.triple(), "aarch64-darwin");

    let triplet = Triplet::new(Arch::X86_64, Os::Linux);
    assert_eq!(triplet.triple(), "x86_64-linux");
  }

  #[test]
  fn parses_triple() {
    let triplet: Triplet = "x86_64-linux".parse().unwrap();
    assert_eq!(triplet, Triplet::new(Arch::X86_64, Os::Linux));

    let triplet: Triplet = "arm64-macos".parse().unwrap();
    assert_eq!(triplet, Triplet::new(Arch::Aarch64, Os::MacOs));
  }

  #[test]
  fn rejects_malformed_triple() {
    assert_eq!(
      "linux".parse::<Triplet>(),
      Err(PlatformError::InvalidTriplet("linux".to_string()))
    );
    assert!(matches!(
      "x86_64-beos".parse::<Triplet>(),
      Err(PlatformError::UnknownOs(_))
    ));
  }

  #[test]
  fn host_is_detected() {
    assert!(Triplet::host().is_some());
  }
}
