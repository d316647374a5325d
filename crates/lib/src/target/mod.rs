//! Per-OS native build pipelines.
//!
//! A [`TargetConfiguration`] turns compiled classes into an executable in four
//! ordered stages: compile the C glue sources, run `native-image` to emit a
//! relocatable object, link everything against the static runtime libraries,
//! and finally run the result. The stages are shared; each OS only supplies a
//! [`Toolchain`] describing its compiler, flags and system libraries.
//!
//! Stage results follow one convention: `Err` for a precondition that could not
//! be met (nothing was launched, or launching itself failed), `Ok(false)` when an
//! external tool ran and failed (its output has already been written to the
//! sink), `Ok(true)` on success.

mod common;
mod darwin;
mod linux;
mod paths;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::CacheError;
use crate::config::ProjectConfiguration;
use crate::platform::{Os, Triplet};
use crate::process::{LineStream, OutputSink, ProcessError, ProcessRunner};

pub use darwin::MacOsTargetConfiguration;
pub use linux::LinuxTargetConfiguration;
pub use paths::ProcessPaths;

use common::{
  GLUE_SOURCES, blocking, find_object, glue_object_name, library_dir_flag, library_dirs, platform_flag, program_path,
  remove_objects, reset_dir, run_stage, verbose_compiler_flags,
};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("no main class configured")]
  MissingMainClass,

  #[error("class path is empty")]
  EmptyClassPath,

  #[error("invalid class path: {0}")]
  InvalidClassPath(String),

  #[error("object file {name} not found under {}", dir.display())]
  ObjectFileNotFound { name: String, dir: PathBuf },

  #[error("unsupported target: {0}")]
  UnsupportedTarget(Triplet),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("build task failed: {0}")]
  Task(String),
}

/// Compiler and linker conventions of one operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  pub c_compiler: PathBuf,
  pub linker: PathBuf,
  /// Extra flags for compiling the glue sources.
  pub compile_flags: Vec<String>,
  /// Flags placed after the objects on the link line.
  pub link_flags: Vec<String>,
  /// Libraries passed as `-l<name>`, in link order.
  pub link_libraries: Vec<String>,
}

/// The build pipeline of one target operating system.
///
/// Implementors provide the [`Toolchain`] and a diagnostics sink; the stages
/// themselves are shared.
#[allow(async_fn_in_trait)]
pub trait TargetConfiguration {
  /// Where failed stages dump the output of the tool that failed.
  fn sink(&self) -> &OutputSink;

  fn toolchain(&self, config: &ProjectConfiguration) -> Toolchain;

  /// Write the glue sources into the intermediate directory and compile each to an object.
  async fn compile_additional_sources(
    &self,
    paths: &ProcessPaths,
    config: &ProjectConfiguration,
  ) -> Result<bool, BuildError> {
    let toolchain = self.toolchain(config);
    create_dir(&paths.intermediate_dir).await?;

    for (name, source) in GLUE_SOURCES {
      let source_path = paths.intermediate_dir.join(name);
      tokio::fs::write(&source_path, source)
        .await
        .map_err(|source| BuildError::Io {
          path: source_path.clone(),
          source,
        })?;

      let mut runner = ProcessRunner::new(program_path(&toolchain.c_compiler));
      runner
        .arg("-c")
        .args(&toolchain.compile_flags)
        .arg(&source_path)
        .arg("-o")
        .arg(paths.intermediate_dir.join(glue_object_name(name)))
        .current_dir(&paths.intermediate_dir);

      if !run_stage(&runner, "compile glue", self.sink()).await? {
        return Ok(false);
      }
    }
    Ok(true)
  }

  /// Run `native-image` to produce the relocatable object for the main class.
  ///
  /// Succeeds only when the compiler exits zero and the object can be found
  /// under the intermediate directory.
  async fn compile(
    &self,
    paths: &ProcessPaths,
    config: &ProjectConfiguration,
    class_path: &[PathBuf],
  ) -> Result<bool, BuildError> {
    if config.main_class.trim().is_empty() {
      return Err(BuildError::MissingMainClass);
    }
    if class_path.is_empty() {
      return Err(BuildError::EmptyClassPath);
    }
    let joined = std::env::join_paths(class_path).map_err(|e| BuildError::InvalidClassPath(e.to_string()))?;

    create_dir(&paths.intermediate_dir).await?;
    reset_dir(&paths.scratch_dir).await?;

    // A leftover object must not pass for the output of this run.
    let object_name = config.object_file_name();
    remove_objects(&paths.intermediate_dir, &object_name).await?;

    let mut temp_dir_flag = std::ffi::OsString::from("-H:TempDirectory=");
    temp_dir_flag.push(&paths.scratch_dir);

    let mut runner = ProcessRunner::new(program_path(&config.native_image_path()));
    runner
      .arg(platform_flag(&config.target, config.use_jni))
      .arg(temp_dir_flag)
      .arg("-H:+ExitAfterRelocatableImageWrite");
    if config.use_jni {
      runner.arg("-H:+JNI");
    }
    if config.verbose {
      runner.args(verbose_compiler_flags());
    }
    runner
      .args(&config.compiler_args)
      .arg("-cp")
      .arg(joined)
      .arg(&config.main_class)
      .current_dir(&paths.intermediate_dir);

    let output = runner.run().await?;
    if !output.success() {
      warn!(exit_code = ?output.exit_code, "native-image failed");
      self.sink().dump(&output.output);
      return Ok(false);
    }

    match find_object(&paths.intermediate_dir, &object_name).await? {
      Some(object) => {
        info!(object = ?object, "image object written");
        Ok(true)
      }
      None => {
        warn!(object = %object_name, dir = ?paths.intermediate_dir, "native-image produced no object file");
        self.sink().dump(&output.output);
        Ok(false)
      }
    }
  }

  /// Link the glue objects and the image object into `<artifact_dir>/<app name>`.
  ///
  /// The linker writes to a temporary name that is renamed into place only on
  /// success, so a failed link never leaves a file at the final path.
  async fn link(&self, paths: &ProcessPaths, config: &ProjectConfiguration) -> Result<bool, BuildError> {
    let object_name = config.object_file_name();
    let object = find_object(&paths.intermediate_dir, &object_name)
      .await?
      .ok_or_else(|| BuildError::ObjectFileNotFound {
        name: object_name,
        dir: paths.intermediate_dir.clone(),
      })?;

    let mut glue_objects = Vec::with_capacity(GLUE_SOURCES.len());
    for (name, _) in GLUE_SOURCES {
      let glue = paths.intermediate_dir.join(glue_object_name(name));
      let present = tokio::fs::metadata(&glue).await.is_ok_and(|meta| meta.is_file());
      if !present {
        return Err(BuildError::ObjectFileNotFound {
          name: glue_object_name(name),
          dir: paths.intermediate_dir.clone(),
        });
      }
      glue_objects.push(glue);
    }

    create_dir(&paths.artifact_dir).await?;
    let app_name = config.app_name();
    let artifact_dir = paths.artifact_dir.clone();
    let prefix = format!(".{}-", app_name);
    let staged = blocking(move || {
      tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(&artifact_dir)
        .map(|file| file.into_temp_path())
        .map_err(|source| BuildError::Io {
          path: artifact_dir,
          source,
        })
    })
    .await?;

    let toolchain = self.toolchain(config);
    let mut runner = ProcessRunner::new(program_path(&toolchain.linker));
    runner
      .arg("-o")
      .arg(&*staged)
      .args(&glue_objects)
      .arg(&object)
      .args(library_dirs(config).iter().map(|dir| library_dir_flag(dir)))
      .args(&toolchain.link_flags)
      .args(toolchain.link_libraries.iter().map(|lib| format!("-l{}", lib)))
      .args(&config.linker_args)
      .current_dir(&paths.intermediate_dir);

    if !run_stage(&runner, "link", self.sink()).await? {
      return Ok(false);
    }

    let app_path = paths.app_path(&app_name);
    let dest = app_path.clone();
    blocking(move || {
      make_executable(&staged)?;
      staged.persist(&dest).map_err(|e| BuildError::Io {
        path: dest,
        source: e.error,
      })
    })
    .await?;
    info!(path = ?app_path, "linked executable");
    Ok(true)
  }

  /// Start the linked executable and hand back its live output.
  fn run(&self, paths: &ProcessPaths, app_name: &str) -> Result<LineStream, BuildError> {
    Ok(app_runner(paths, app_name).spawn_lines()?)
  }

  /// Run the linked executable to completion, forwarding output as it arrives.
  async fn run_until_end(&self, paths: &ProcessPaths, app_name: &str) -> Result<bool, BuildError> {
    let output = app_runner(paths, app_name).run_streaming(self.sink()).await?;
    if output.success() {
      return Ok(true);
    }
    warn!(app = app_name, exit_code = ?output.exit_code, "application failed");
    self.sink().dump(&output.output);
    Ok(false)
  }
}

fn app_runner(paths: &ProcessPaths, app_name: &str) -> ProcessRunner {
  let mut runner = ProcessRunner::new(paths.app_path(app_name));
  runner.current_dir(&paths.artifact_dir);
  runner
}

async fn create_dir(dir: &Path) -> Result<(), BuildError> {
  tokio::fs::create_dir_all(dir).await.map_err(|source| BuildError::Io {
    path: dir.to_path_buf(),
    source,
  })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), BuildError> {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|source| BuildError::Io {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), BuildError> {
  Ok(())
}

/// The pipeline for a given target, selected by operating system.
#[derive(Debug, Clone)]
pub enum Target {
  Linux(LinuxTargetConfiguration),
  MacOs(MacOsTargetConfiguration),
}

impl Target {
  pub fn for_triplet(triplet: &Triplet, sink: OutputSink) -> Result<Self, BuildError> {
    match triplet.os {
      Os::Linux => Ok(Target::Linux(LinuxTargetConfiguration::new(sink))),
      Os::MacOs => Ok(Target::MacOs(MacOsTargetConfiguration::new(sink))),
      Os::Windows => Err(BuildError::UnsupportedTarget(*triplet)),
    }
  }
}

impl TargetConfiguration for Target {
  fn sink(&self) -> &OutputSink {
    match self {
      Target::Linux(target) => target.sink(),
      Target::MacOs(target) => target.sink(),
    }
  }

  fn toolchain(&self, config: &ProjectConfiguration) -> Toolchain {
    match self {
      Target::Linux(target) => target.toolchain(config),
      Target::MacOs(target) => target.toolchain(config),
    }
  }
}
