//! Test utilities for substrate-lib.
//!
//! Stub toolchains are small `/bin/sh` scripts standing in for `native-image`,
//! the C compiler and the linker. They record their arguments and create the
//! files the real tools would.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::config::ProjectConfiguration;
use crate::platform::Triplet;
use crate::process::OutputSink;
use crate::target::ProcessPaths;

/// Creates whatever file follows `-o`, like a compiler or linker would.
const OUTPUT_WRITER: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
: > "$out"
"#;

/// Write an executable `/bin/sh` script.
pub fn write_script(path: &Path, body: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A sink that records every line it receives.
pub fn captured_sink() -> (OutputSink, Arc<Mutex<Vec<String>>>) {
  let lines = Arc::new(Mutex::new(Vec::new()));
  let captured = lines.clone();
  let sink = OutputSink::new(move |line| captured.lock().unwrap().push(line.to_string()));
  (sink, lines)
}

/// A temporary project with stub tools wired into its configuration.
pub struct StubToolchain {
  temp: TempDir,
  pub config: ProjectConfiguration,
}

impl StubToolchain {
  pub fn new(main_class: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let classes = root.join("classes");
    fs::create_dir_all(&classes).unwrap();

    let config = ProjectConfiguration {
      main_class: main_class.to_string(),
      class_path: Some(classes.to_string_lossy().into_owned()),
      graalvm_home: root.join("graal"),
      target: Triplet::host().unwrap(),
      build_root: root.join("build"),
      cache_root: root.join("cache"),
      static_root: Some(root.join("static")),
      c_compiler: Some(root.join("bin").join("cc")),
      linker: Some(root.join("bin").join("cc")),
      ..Default::default()
    };

    let stub = Self { temp, config };
    stub.set_native_image(&format!(
      "echo 'building image'\n: > '{}'\n",
      stub.config.object_file_name()
    ));
    write_script(
      &stub.root().join("bin").join("cc"),
      &format!("printf '%s\\n' \"$@\" > '{}'\n{}", stub.linker_log().display(), OUTPUT_WRITER),
    );
    stub
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn class_path(&self) -> Vec<PathBuf> {
    vec![self.root().join("classes")]
  }

  pub fn paths(&self) -> ProcessPaths {
    ProcessPaths::create(&self.config.build_root, &self.config.target).unwrap()
  }

  /// Replace the `native-image` stub. The script runs in the intermediate directory.
  pub fn set_native_image(&self, body: &str) {
    let log = self.root().join("native-image.args");
    write_script(
      &self.config.native_image_path(),
      &format!("printf '%s\\n' \"$@\" > '{}'\n{}", log.display(), body),
    );
  }

  /// Use a separate linker stub with the given body.
  pub fn set_linker(&mut self, body: &str) {
    let path = self.root().join("bin").join("ld");
    write_script(&path, body);
    self.config.linker = Some(path);
  }

  /// Install a fake linked executable.
  pub fn write_app(&self, paths: &ProcessPaths, app_name: &str, body: &str) {
    write_script(&paths.app_path(app_name), body);
  }

  /// Arguments of the last `native-image` invocation, one per element.
  pub fn native_image_args(&self) -> Vec<String> {
    read_lines(&self.root().join("native-image.args"))
  }

  /// Arguments of the last compiler or linker invocation.
  pub fn linker_args(&self) -> Vec<String> {
    read_lines(&self.linker_log())
  }

  fn linker_log(&self) -> PathBuf {
    self.root().join("cc.args")
  }
}

fn read_lines(path: &Path) -> Vec<String> {
  fs::read_to_string(path)
    .unwrap()
    .lines()
    .map(str::to_string)
    .collect()
}
