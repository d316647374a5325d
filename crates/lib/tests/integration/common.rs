//! Shared helpers for library integration tests.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use substrate_lib::config::ProjectConfiguration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Build an in-memory ZIP archive.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  for (name, content) in files {
    writer.start_file(*name, SimpleFileOptions::default()).unwrap();
    writer.write_all(content).unwrap();
  }
  writer.finish().unwrap().into_inner()
}

/// A Java static SDK archive for Linux as the download server would serve it.
pub fn java_static_sdk_zip() -> Vec<u8> {
  zip_bytes(&[
    ("linux-libs/libjava.a", b"java"),
    ("linux-libs/libnet.a", b"net"),
    ("linux-libs/libnio.a", b"nio"),
    ("linux-libs/libzip.a", b"zip"),
  ])
}

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn cache_root(&self) -> PathBuf {
    self.path().join("cache")
  }

  /// Configuration targeting Linux with every root inside the temp directory.
  pub fn config(&self, main_class: &str) -> ProjectConfiguration {
    ProjectConfiguration {
      main_class: main_class.to_string(),
      class_path: Some(self.path().join("classes").to_string_lossy().into_owned()),
      graalvm_home: self.path().join("graal"),
      target: "x86_64-linux".parse().unwrap(),
      build_root: self.path().join("build"),
      cache_root: self.cache_root(),
      ..Default::default()
    }
  }

  /// Write an executable `/bin/sh` script.
  #[cfg(unix)]
  pub fn write_script(&self, relative: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.path().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }
}
