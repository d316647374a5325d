use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::platform::PlatformError;

/// Operating systems a native image can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  #[serde(rename = "darwin")]
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this OS
  ///
  /// This is the value substituted for `${target}` in bundle URLs.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  /// Name of the OS as used in `org.graalvm.nativeimage.Platform` constants
  pub fn graal_name(&self) -> &'static str {
    match self {
      Self::Linux => "LINUX",
      Self::MacOs => "DARWIN",
      Self::Windows => "WINDOWS",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Os {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "linux" => Ok(Self::Linux),
      "darwin" | "macos" => Ok(Self::MacOs),
      "windows" => Ok(Self::Windows),
      other => Err(PlatformError::UnknownOs(other.to_string())),
    }
  }
}
