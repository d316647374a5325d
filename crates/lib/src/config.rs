//! Project configuration.
//!
//! A [`ProjectConfiguration`] is built once per invocation, usually from a
//! `substrate.toml` file with command-line overrides applied on top, and is
//! read-only for the rest of the build.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::platform::paths::cache_dir;
use crate::platform::{Arch, Os, Triplet};

pub const DEFAULT_JAVA_STATIC_SDK_VERSION: &str = "11-ea+10";
pub const DEFAULT_JAVAFX_STATIC_SDK_VERSION: &str = "14-ea+1";

pub const DEFAULT_JAVA_STATIC_SDK_URL: &str =
  "https://download2.gluonhq.com/substrate/staticjdk/labs-staticjdk-${target}-gvm-${version}.zip";
pub const DEFAULT_JAVAFX_STATIC_SDK_URL: &str =
  "https://download2.gluonhq.com/omega/javafxstaticsdk/${target}-libsfx-${version}.zip";

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse config {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },
}

/// Everything the build pipeline needs to know about the project and toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfiguration {
  /// Fully qualified main class, e.g. `hello.HelloWorld`.
  pub main_class: String,
  /// Class path in platform path-separator form.
  pub class_path: Option<String>,
  /// Name of the produced executable. Derived from the main class when unset.
  pub app_name: Option<String>,
  /// Root of the GraalVM installation providing `bin/native-image`.
  pub graalvm_home: PathBuf,
  pub target: Triplet,
  /// Directory builds write into (`gvm/`, `gvm/tmp/`, `<target>/`).
  pub build_root: PathBuf,
  /// Root of the dependency cache.
  pub cache_root: PathBuf,
  /// Directory holding the Java static libraries. Never downloaded into when set.
  pub static_root: Option<PathBuf>,
  /// JavaFX static SDK root (containing `lib/`). Never downloaded into when set.
  pub javafx_root: Option<PathBuf>,
  pub java_static_sdk_version: String,
  pub javafx_static_sdk_version: String,
  pub java_static_sdk_url: String,
  pub javafx_static_sdk_url: String,
  pub verbose: bool,
  /// Verify cached bundles against their checksum maps.
  pub enable_check_hash: bool,
  pub use_jni: bool,
  pub use_javafx: bool,
  /// C compiler used for the glue sources. Target default when unset.
  pub c_compiler: Option<PathBuf>,
  /// Linker driver. Target default when unset.
  pub linker: Option<PathBuf>,
  /// Extra arguments passed to `native-image` before the class path.
  pub compiler_args: Vec<String>,
  /// Extra arguments appended to the link command.
  pub linker_args: Vec<String>,
}

impl Default for ProjectConfiguration {
  fn default() -> Self {
    Self {
      main_class: String::new(),
      class_path: None,
      app_name: None,
      graalvm_home: PathBuf::new(),
      target: Triplet::host().unwrap_or(Triplet::new(Arch::X86_64, Os::Linux)),
      build_root: PathBuf::from("target").join("substrate"),
      cache_root: cache_dir(),
      static_root: None,
      javafx_root: None,
      java_static_sdk_version: DEFAULT_JAVA_STATIC_SDK_VERSION.to_string(),
      javafx_static_sdk_version: DEFAULT_JAVAFX_STATIC_SDK_VERSION.to_string(),
      java_static_sdk_url: DEFAULT_JAVA_STATIC_SDK_URL.to_string(),
      javafx_static_sdk_url: DEFAULT_JAVAFX_STATIC_SDK_URL.to_string(),
      verbose: false,
      enable_check_hash: true,
      use_jni: true,
      use_javafx: false,
      c_compiler: None,
      linker: None,
      compiler_args: Vec::new(),
      linker_args: Vec::new(),
    }
  }
}

impl ProjectConfiguration {
  /// Load a configuration file. Relative paths in the file are resolved
  /// against the file's directory.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let base = path
      .parent()
      .filter(|p| !p.as_os_str().is_empty())
      .map(|p| dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()))
      .unwrap_or_else(|| PathBuf::from("."));
    config.resolve_relative_to(&base);

    debug!(path = ?path, main_class = %config.main_class, target = %config.target, "loaded configuration");
    Ok(config)
  }

  pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }

  /// Fill unset values from the environment (`GRAALVM_HOME`).
  pub fn with_env_fallbacks(mut self) -> Self {
    if self.graalvm_home.as_os_str().is_empty() {
      if let Some(home) = std::env::var_os("GRAALVM_HOME") {
        self.graalvm_home = PathBuf::from(home);
      }
    }
    self
  }

  fn resolve_relative_to(&mut self, base: &Path) {
    let resolve = |p: &mut PathBuf| {
      if !p.as_os_str().is_empty() && p.is_relative() {
        *p = base.join(&*p);
      }
    };
    resolve(&mut self.graalvm_home);
    resolve(&mut self.build_root);
    resolve(&mut self.cache_root);
    for p in [&mut self.static_root, &mut self.javafx_root].into_iter().flatten() {
      resolve(p);
    }
    if let Some(class_path) = &self.class_path {
      let entries = std::env::split_paths(class_path).map(|mut entry| {
        resolve(&mut entry);
        entry
      });
      if let Ok(joined) = std::env::join_paths(entries) {
        self.class_path = Some(joined.to_string_lossy().into_owned());
      }
    }
    for p in [&mut self.c_compiler, &mut self.linker].into_iter().flatten() {
      // Bare program names ("gcc") are looked up on PATH, not resolved.
      if p.components().count() > 1 {
        resolve(p);
      }
    }
  }

  /// Name of the produced executable.
  pub fn app_name(&self) -> String {
    match &self.app_name {
      Some(name) => name.clone(),
      None => self
        .main_class
        .rsplit('.')
        .next()
        .unwrap_or(&self.main_class)
        .to_lowercase(),
    }
  }

  /// File name of the relocatable object `native-image` emits for the main class.
  pub fn object_file_name(&self) -> String {
    format!("{}.o", self.main_class.to_lowercase())
  }

  /// Path of the `native-image` launcher inside the GraalVM installation.
  pub fn native_image_path(&self) -> PathBuf {
    let name = if cfg!(windows) { "native-image.cmd" } else { "native-image" };
    self.graalvm_home.join("bin").join(name)
  }

  /// GraalVM's bundled C libraries for the target (`lib/svm/clibraries/linux-amd64`).
  pub fn graal_clibraries_dir(&self) -> PathBuf {
    self
      .graalvm_home
      .join("lib")
      .join("svm")
      .join("clibraries")
      .join(format!("{}-{}", self.target.os, self.target.arch.clibraries_name()))
  }

  /// Directory holding the Java static libraries for the target.
  pub fn java_static_libs_dir(&self) -> PathBuf {
    match &self.static_root {
      Some(root) => root.clone(),
      None => self
        .cache_root
        .join(crate::cache::JAVA_STATIC_SDK_FOLDER)
        .join(&self.java_static_sdk_version)
        .join(format!("{}-libs", self.target.os)),
    }
  }

  /// Directory holding the JavaFX static libraries for the target.
  pub fn javafx_libs_dir(&self) -> PathBuf {
    match &self.javafx_root {
      Some(root) => root.join("lib"),
      None => self
        .cache_root
        .join(crate::cache::JAVAFX_STATIC_SDK_FOLDER)
        .join(&self.javafx_static_sdk_version)
        .join(format!("{}-sdk", self.target.os))
        .join("lib"),
    }
  }
}
