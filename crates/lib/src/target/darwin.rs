use std::path::PathBuf;

use crate::config::ProjectConfiguration;
use crate::platform::Arch;
use crate::process::OutputSink;
use crate::target::common::{JAVA_RUNTIME_LIBRARIES, JAVAFX_LIBRARIES};
use crate::target::{TargetConfiguration, Toolchain};

const SYSTEM_LIBRARIES: &[&str] = &["z", "pthread"];

const FRAMEWORKS: &[&str] = &["Foundation", "CoreServices"];

const JAVAFX_FRAMEWORKS: &[&str] = &["AppKit", "ApplicationServices", "OpenGL", "QuartzCore", "Security"];

/// macOS: `clang` with explicit `-arch` and system frameworks.
#[derive(Debug, Clone, Default)]
pub struct MacOsTargetConfiguration {
  sink: OutputSink,
}

impl MacOsTargetConfiguration {
  pub fn new(sink: OutputSink) -> Self {
    Self { sink }
  }
}

fn clang_arch(arch: Arch) -> &'static str {
  match arch {
    Arch::X86_64 => "x86_64",
    Arch::Aarch64 => "arm64",
  }
}

impl TargetConfiguration for MacOsTargetConfiguration {
  fn sink(&self) -> &OutputSink {
    &self.sink
  }

  fn toolchain(&self, config: &ProjectConfiguration) -> Toolchain {
    let c_compiler = config.c_compiler.clone().unwrap_or_else(|| PathBuf::from("clang"));
    let linker = config.linker.clone().unwrap_or_else(|| c_compiler.clone());
    let arch = clang_arch(config.target.arch);

    let mut link_flags = vec!["-arch".to_string(), arch.to_string()];
    let mut frameworks: Vec<&str> = FRAMEWORKS.to_vec();
    let mut link_libraries: Vec<String> = JAVA_RUNTIME_LIBRARIES.iter().map(|l| l.to_string()).collect();
    if config.use_javafx {
      link_libraries.extend(JAVAFX_LIBRARIES.iter().map(|l| l.to_string()));
      frameworks.extend_from_slice(JAVAFX_FRAMEWORKS);
    }
    link_libraries.extend(SYSTEM_LIBRARIES.iter().map(|l| l.to_string()));
    for framework in frameworks {
      link_flags.push(format!("-Wl,-framework,{}", framework));
    }

    Toolchain {
      c_compiler,
      linker,
      compile_flags: vec!["-arch".to_string(), arch.to_string()],
      link_flags,
      link_libraries,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::{Os, Triplet};

  #[test]
  fn uses_clang_with_target_arch() {
    let config = ProjectConfiguration {
      target: Triplet::new(Arch::Aarch64, Os::MacOs),
      ..Default::default()
    };

    let toolchain = MacOsTargetConfiguration::default().toolchain(&config);

    assert_eq!(toolchain.c_compiler, PathBuf::from("clang"));
    assert_eq!(toolchain.compile_flags, vec!["-arch", "arm64"]);
    assert!(toolchain.link_flags.contains(&"-Wl,-framework,Foundation".to_string()));
    assert!(!toolchain.link_flags.contains(&"-Wl,-framework,AppKit".to_string()));
  }

  #[test]
  fn javafx_adds_frameworks() {
    let config = ProjectConfiguration {
      target: Triplet::new(Arch::X86_64, Os::MacOs),
      use_javafx: true,
      ..Default::default()
    };

    let toolchain = MacOsTargetConfiguration::default().toolchain(&config);

    assert_eq!(toolchain.compile_flags, vec!["-arch", "x86_64"]);
    assert!(toolchain.link_flags.contains(&"-Wl,-framework,AppKit".to_string()));
    assert!(toolchain.link_libraries.contains(&"glass".to_string()));
  }
}
