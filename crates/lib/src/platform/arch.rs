use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::platform::PlatformError;

/// CPU architectures a native image can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  #[serde(rename = "x86_64")]
  X86_64,
  Aarch64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
    }
  }

  /// Name of the architecture as used in `org.graalvm.nativeimage.Platform` constants
  pub fn graal_name(&self) -> &'static str {
    match self {
      Self::X86_64 => "AMD64",
      Self::Aarch64 => "AARCH64",
    }
  }

  /// Directory name GraalVM uses for its per-platform C libraries (`linux-amd64`)
  pub fn clibraries_name(&self) -> &'static str {
    match self {
      Self::X86_64 => "amd64",
      Self::Aarch64 => "aarch64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "x86_64" | "amd64" => Ok(Self::X86_64),
      "aarch64" | "arm64" => Ok(Self::Aarch64),
      other => Err(PlatformError::UnknownArch(other.to_string())),
    }
  }
}
