use std::path::PathBuf;

use crate::config::ProjectConfiguration;
use crate::process::OutputSink;
use crate::target::common::{JAVA_RUNTIME_LIBRARIES, JAVAFX_LIBRARIES};
use crate::target::{TargetConfiguration, Toolchain};

const SYSTEM_LIBRARIES: &[&str] = &["z", "dl", "pthread", "rt", "m"];

const JAVAFX_SYSTEM_LIBRARIES: &[&str] = &["GL", "X11", "Xtst", "gtk-3", "gdk-3", "gobject-2.0", "glib-2.0"];

/// GNU/Linux: `gcc` for glue sources and linking.
#[derive(Debug, Clone, Default)]
pub struct LinuxTargetConfiguration {
  sink: OutputSink,
}

impl LinuxTargetConfiguration {
  pub fn new(sink: OutputSink) -> Self {
    Self { sink }
  }
}

impl TargetConfiguration for LinuxTargetConfiguration {
  fn sink(&self) -> &OutputSink {
    &self.sink
  }

  fn toolchain(&self, config: &ProjectConfiguration) -> Toolchain {
    let c_compiler = config.c_compiler.clone().unwrap_or_else(|| PathBuf::from("gcc"));
    let linker = config.linker.clone().unwrap_or_else(|| c_compiler.clone());

    let mut link_libraries: Vec<String> = JAVA_RUNTIME_LIBRARIES.iter().map(|l| l.to_string()).collect();
    if config.use_javafx {
      link_libraries.extend(JAVAFX_LIBRARIES.iter().map(|l| l.to_string()));
      link_libraries.extend(JAVAFX_SYSTEM_LIBRARIES.iter().map(|l| l.to_string()));
    }
    link_libraries.extend(SYSTEM_LIBRARIES.iter().map(|l| l.to_string()));

    Toolchain {
      c_compiler,
      linker,
      compile_flags: Vec::new(),
      link_flags: vec!["-Wl,--gc-sections".to_string()],
      link_libraries,
    }
  }
}
