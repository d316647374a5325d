//! Descriptions of the static-library bundles a build depends on.

use std::path::{Path, PathBuf};

use crate::config::ProjectConfiguration;
use crate::platform::Os;

pub const JAVA_STATIC_SDK_FOLDER: &str = "javaStaticSdk";
pub const JAVAFX_STATIC_SDK_FOLDER: &str = "javafxStaticSdk";

const JAVA_STATIC_FILES: &[&str] = &["libjava.a", "libnet.a", "libnio.a", "libzip.a"];

const JAVAFX_STATIC_FILES: &[&str] = &[
  "javafx.base.jar",
  "javafx.controls.jar",
  "javafx.graphics.jar",
  "javafx.fxml.jar",
  "javafx.media.jar",
  "javafx.web.jar",
  "libglass.a",
];

/// A versioned set of files fetched as one ZIP archive.
///
/// `url_template` and `files_subdir` may contain `${target}` and `${version}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
  /// Cache sub-folder, also used to name the checksum map.
  pub folder: String,
  pub version: String,
  pub url_template: String,
  /// Directory inside the version directory holding `files`.
  pub files_subdir: String,
  /// File names that must be present for the bundle to be usable.
  pub files: Vec<String>,
}

impl BundleDescriptor {
  /// Java static SDK: the JDK's native libraries built as static archives.
  pub fn java_static_sdk(config: &ProjectConfiguration) -> Self {
    Self {
      folder: JAVA_STATIC_SDK_FOLDER.to_string(),
      version: config.java_static_sdk_version.clone(),
      url_template: config.java_static_sdk_url.clone(),
      files_subdir: "${target}-libs".to_string(),
      files: JAVA_STATIC_FILES.iter().map(|f| f.to_string()).collect(),
    }
  }

  /// JavaFX static SDK: module jars plus the static UI toolkit libraries.
  pub fn javafx_static_sdk(config: &ProjectConfiguration) -> Self {
    Self {
      folder: JAVAFX_STATIC_SDK_FOLDER.to_string(),
      version: config.javafx_static_sdk_version.clone(),
      url_template: config.javafx_static_sdk_url.clone(),
      files_subdir: "${target}-sdk/lib".to_string(),
      files: JAVAFX_STATIC_FILES.iter().map(|f| f.to_string()).collect(),
    }
  }

  /// Download URL for `target`.
  pub fn url(&self, target: Os) -> String {
    self.substitute(&self.url_template, target)
  }

  /// `<cache_root>/<folder>`
  pub fn folder_dir(&self, cache_root: &Path) -> PathBuf {
    cache_root.join(&self.folder)
  }

  /// `<cache_root>/<folder>/<version>`
  pub fn version_dir(&self, cache_root: &Path) -> PathBuf {
    self.folder_dir(cache_root).join(&self.version)
  }

  /// Directory the expected files live in once extracted.
  pub fn files_dir(&self, cache_root: &Path, target: Os) -> PathBuf {
    let subdir = self.substitute(&self.files_subdir, target);
    subdir
      .split('/')
      .filter(|part| !part.is_empty())
      .fold(self.version_dir(cache_root), |dir, part| dir.join(part))
  }

  /// Expected files as checksum-map keys: `/`-separated and relative to the version directory.
  pub fn expected_keys(&self, target: Os) -> Vec<String> {
    let subdir = self.substitute(&self.files_subdir, target);
    let subdir = subdir.trim_matches('/');
    self
      .files
      .iter()
      .map(|file| {
        if subdir.is_empty() {
          file.clone()
        } else {
          format!("{}/{}", subdir, file)
        }
      })
      .collect()
  }

  /// Checksum map location, one level above the version directory.
  ///
  /// The version is part of the name so two cached versions never share a map.
  pub fn checksum_map_path(&self, cache_root: &Path, target: Os) -> PathBuf {
    self
      .folder_dir(cache_root)
      .join(format!("{}-{}-{}.md5", self.folder, target, self.version))
  }

  /// Advisory lock file serializing population of this bundle version.
  pub fn lock_path(&self, cache_root: &Path) -> PathBuf {
    self.folder_dir(cache_root).join(format!(".{}.lock", self.version))
  }

  fn substitute(&self, template: &str, target: Os) -> String {
    template
      .replace("${target}", target.as_str())
      .replace("${version}", &self.version)
  }
}
