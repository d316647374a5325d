//! CLI smoke tests for substrate.
//!
//! These tests verify that the commands run without panicking, return the
//! right exit codes, and drive stub toolchains end to end.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the substrate binary, isolated in `dir`.
fn substrate_cmd(dir: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("substrate");
  cmd
    .current_dir(dir.path())
    .env("SUBSTRATE_CACHE_DIR", dir.path().join("cache"))
    .env_remove("RUST_LOG");
  cmd
}

fn write_config(dir: &TempDir, content: &str) {
  std::fs::write(dir.path().join("substrate.toml"), content).unwrap();
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Info
// =============================================================================

#[test]
fn info_shows_target_and_cache() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .args(["info", "--target", "aarch64-darwin"])
    .assert()
    .success()
    .stdout(predicate::str::contains("aarch64-darwin"))
    .stdout(predicate::str::contains("cache"));
}

#[test]
fn info_json_is_parseable() {
  let temp = TempDir::new().unwrap();
  let output = substrate_cmd(&temp)
    .args(["info", "--output", "json", "--target", "x86_64-linux"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["target"], "x86_64-linux");
  assert_eq!(json["bundles"][0], "javaStaticSdk 11-ea+10");
}

#[test]
fn info_reads_config_file() {
  let temp = TempDir::new().unwrap();
  write_config(&temp, "main_class = \"hello.HelloWorld\"\ntarget = \"x86_64-darwin\"\n");

  substrate_cmd(&temp)
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("hello.HelloWorld"))
    .stdout(predicate::str::contains("x86_64-darwin"));
}

#[test]
fn invalid_target_is_rejected() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .args(["info", "--target", "sparc-solaris"])
    .assert()
    .failure();
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn missing_config_file_fails() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .args(["--config", "nope.toml", "info"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn compile_requires_class_path() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .args(["compile", "--main-class", "Hello"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No class path"));
}

#[test]
fn compile_for_windows_is_unsupported() {
  let temp = TempDir::new().unwrap();
  substrate_cmd(&temp)
    .args(["compile", "--target", "x86_64-windows", "--main-class", "Hello", "--cp", "classes"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unsupported target"));
}

#[test]
fn deps_with_configured_roots_fetches_nothing() {
  let temp = TempDir::new().unwrap();
  write_config(&temp, "main_class = \"Hello\"\nstatic_root = \"static\"\n");

  substrate_cmd(&temp)
    .arg("deps")
    .assert()
    .success()
    .stdout(predicate::str::contains("No bundles"));
  assert!(!temp.path().join("cache").exists());
}

#[test]
fn deps_json_with_configured_roots_is_empty() {
  let temp = TempDir::new().unwrap();
  write_config(&temp, "main_class = \"Hello\"\nstatic_root = \"static\"\n");

  let output = substrate_cmd(&temp).args(["deps", "--output", "json"]).output().unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["bundles"], serde_json::json!([]));
}

// =============================================================================
// Stub toolchain
// =============================================================================

#[cfg(unix)]
mod stub_toolchain {
  use super::*;
  use std::os::unix::fs::PermissionsExt;

  const CC_STUB: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
printf '#!/bin/sh\necho "Hello from native"\n' > "$out"
"#;

  fn write_script(path: &std::path::Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  fn stub_project(image_body: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    write_script(&temp.path().join("graal/bin/native-image"), image_body);
    write_script(&temp.path().join("bin/cc"), CC_STUB);
    std::fs::create_dir_all(temp.path().join("classes")).unwrap();
    write_config(
      &temp,
      r#"
main_class = "hello.HelloWorld"
class_path = "classes"
graalvm_home = "graal"
target = "x86_64-linux"
static_root = "static"
c_compiler = "bin/cc"
linker = "bin/cc"
build_root = "build"
"#,
    );
    temp
  }

  #[test]
  fn build_and_run() {
    let temp = stub_project(": > hello.helloworld.o\n");

    substrate_cmd(&temp)
      .arg("build")
      .assert()
      .success()
      .stdout(predicate::str::contains("Built helloworld"));
    assert!(temp.path().join("build/x86_64-linux/helloworld").is_file());

    substrate_cmd(&temp)
      .arg("run")
      .assert()
      .success()
      .stderr(predicate::str::contains("Hello from native"));
  }

  #[test]
  fn build_json_reports_artifact() {
    let temp = stub_project(": > hello.helloworld.o\n");

    let output = substrate_cmd(&temp).args(["build", "--output", "json"]).output().unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stage"], "build");
    assert_eq!(json["ok"], true);
    assert_eq!(json["target"], "x86_64-linux");
    assert!(json["artifact"].as_str().unwrap().ends_with("x86_64-linux/helloworld"));
  }

  #[test]
  fn failed_compile_json_has_no_artifact() {
    let temp = stub_project("echo 'Error: bad class file'\nexit 1\n");

    let output = substrate_cmd(&temp).args(["compile", "--output", "json"]).output().unwrap();

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stage"], "compile");
    assert_eq!(json["ok"], false);
    assert!(json.get("artifact").is_none());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bad class file"));
  }

  #[test]
  fn failing_compiler_fails_build() {
    let temp = stub_project("echo 'Error: class hello.HelloWorld not found'\nexit 1\n");

    substrate_cmd(&temp)
      .arg("build")
      .assert()
      .failure()
      .stderr(predicate::str::contains("class hello.HelloWorld not found"))
      .stderr(predicate::str::contains("Build failed"));
    assert!(!temp.path().join("build/x86_64-linux/helloworld").exists());
  }
}
