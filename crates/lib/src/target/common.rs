//! Helpers shared by the per-OS pipelines.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ProjectConfiguration;
use crate::platform::Triplet;
use crate::process::{OutputSink, ProcessRunner};
use crate::target::BuildError;

/// C sources linked into every executable, written next to the image object.
pub const GLUE_SOURCES: &[(&str, &str)] = &[
  ("launcher.c", include_str!("native/launcher.c")),
  ("thread.c", include_str!("native/thread.c")),
];

/// Static libraries every image links against, as `-l` names.
pub const JAVA_RUNTIME_LIBRARIES: &[&str] = &["java", "jvm", "libchelper", "nio", "zip", "net"];

pub const JAVAFX_LIBRARIES: &[&str] = &["glass", "javafx_font", "javafx_iio", "prism_es2"];

const VERBOSE_COMPILER_FLAGS: &[&str] = &["-H:+PrintAnalysisCallTree", "-H:+ReportExceptionStackTraces"];

pub fn glue_object_name(source: &str) -> String {
  let stem = source.strip_suffix(".c").unwrap_or(source);
  format!("{}.o", stem)
}

/// The `-Dsvm.platform` flag selecting the image's target platform.
pub fn platform_flag(target: &Triplet, use_jni: bool) -> String {
  if use_jni {
    format!(
      "-Dsvm.platform=org.graalvm.nativeimage.impl.InternalPlatform${}_JNI_{}",
      target.os.graal_name(),
      target.arch.graal_name()
    )
  } else {
    format!(
      "-Dsvm.platform=org.graalvm.nativeimage.Platform${}_{}",
      target.os.graal_name(),
      target.arch.graal_name()
    )
  }
}

pub fn verbose_compiler_flags() -> impl Iterator<Item = &'static str> {
  VERBOSE_COMPILER_FLAGS.iter().copied()
}

/// Directories passed to the linker as `-L`.
pub fn library_dirs(config: &ProjectConfiguration) -> Vec<PathBuf> {
  let mut dirs = vec![config.java_static_libs_dir(), config.graal_clibraries_dir()];
  if config.use_javafx {
    dirs.push(config.javafx_libs_dir());
  }
  dirs
}

pub fn library_dir_flag(dir: &Path) -> OsString {
  let mut flag = OsString::from("-L");
  flag.push(dir);
  flag
}

/// Make a program path with a directory part absolute.
///
/// Stages set a working directory on the child, and a relative program path
/// would otherwise resolve against it. Bare names are left for `PATH` lookup.
pub fn program_path(path: &Path) -> PathBuf {
  if path.components().count() > 1 {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
  } else {
    path.to_path_buf()
  }
}

/// First regular file called `name` anywhere below `dir`.
pub async fn find_object(dir: &Path, name: &str) -> Result<Option<PathBuf>, BuildError> {
  let (dir, name) = (dir.to_path_buf(), name.to_string());
  blocking(move || Ok(files_named(&dir, &name).next())).await
}

/// Delete every file called `name` below `dir`.
pub async fn remove_objects(dir: &Path, name: &str) -> Result<(), BuildError> {
  let (dir, name) = (dir.to_path_buf(), name.to_string());
  blocking(move || {
    let stale: Vec<PathBuf> = files_named(&dir, &name).collect();
    for path in stale {
      debug!(path = ?path, "removing stale object");
      fs::remove_file(&path).map_err(|source| BuildError::Io { path, source })?;
    }
    Ok(())
  })
  .await
}

fn files_named<'a>(dir: &Path, name: &'a str) -> impl Iterator<Item = PathBuf> + use<'a> {
  WalkDir::new(dir)
    .into_iter()
    .filter_map(Result::ok)
    .filter(move |entry| entry.file_type().is_file() && entry.file_name() == name)
    .map(|entry| entry.into_path())
}

/// Delete and recreate `dir`.
pub async fn reset_dir(dir: &Path) -> Result<(), BuildError> {
  let io_err = |source| BuildError::Io {
    path: dir.to_path_buf(),
    source,
  };
  match tokio::fs::remove_dir_all(dir).await {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(io_err(e)),
  }
  tokio::fs::create_dir_all(dir).await.map_err(io_err)
}

/// Run filesystem work on the blocking pool.
pub async fn blocking<T, F>(work: F) -> Result<T, BuildError>
where
  F: FnOnce() -> Result<T, BuildError> + Send + 'static,
  T: Send + 'static,
{
  tokio::task::spawn_blocking(work)
    .await
    .map_err(|e| BuildError::Task(e.to_string()))?
}

/// Run one pipeline stage. On failure the captured output goes to `sink`.
pub async fn run_stage(runner: &ProcessRunner, stage: &str, sink: &OutputSink) -> Result<bool, BuildError> {
  info!(stage, command = %runner.command_line(), "running stage");
  let output = runner.run().await?;
  if output.success() {
    return Ok(true);
  }
  warn!(stage, exit_code = ?output.exit_code, "stage failed");
  sink.dump(&output.output);
  Ok(false)
}
