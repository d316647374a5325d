//! Entry points driving a whole build for a project configuration.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::setup_dependencies;
use crate::config::ProjectConfiguration;
use crate::process::{LineStream, OutputSink};
use crate::target::{BuildError, ProcessPaths, Target, TargetConfiguration};

/// Split a class path on the platform path separator.
///
/// Empty segments are dropped and relative entries are made absolute, since
/// `native-image` runs in the build's intermediate directory.
pub fn split_class_path(class_path: &str) -> Vec<PathBuf> {
  std::env::split_paths(class_path)
    .filter(|entry| !entry.as_os_str().is_empty())
    .map(|entry| std::path::absolute(&entry).unwrap_or(entry))
    .collect()
}

/// Drives the pipeline of the configuration's target.
#[derive(Debug, Clone)]
pub struct Dispatcher<'a> {
  config: &'a ProjectConfiguration,
  sink: OutputSink,
}

impl<'a> Dispatcher<'a> {
  pub fn new(config: &'a ProjectConfiguration) -> Self {
    Self::with_sink(config, OutputSink::default())
  }

  pub fn with_sink(config: &'a ProjectConfiguration, sink: OutputSink) -> Self {
    Self { config, sink }
  }

  fn target(&self) -> Result<Target, BuildError> {
    Target::for_triplet(&self.config.target, self.sink.clone())
  }

  fn paths(&self) -> Result<ProcessPaths, BuildError> {
    ProcessPaths::create(&self.config.build_root, &self.config.target)
  }

  /// Compile `class_path` and the configured main class to an object file.
  pub async fn native_compile(&self, class_path: &str) -> Result<bool, BuildError> {
    let target = self.target()?;
    let class_path = split_class_path(class_path);
    target.compile(&self.paths()?, self.config, &class_path).await
  }

  pub async fn native_link(&self) -> Result<bool, BuildError> {
    let target = self.target()?;
    let paths = self.paths()?;
    if !target.compile_additional_sources(&paths, self.config).await? {
      return Ok(false);
    }
    target.link(&paths, self.config).await
  }

  /// Run the linked executable to completion.
  pub async fn native_run(&self) -> Result<bool, BuildError> {
    let target = self.target()?;
    target.run_until_end(&self.paths()?, &self.config.app_name()).await
  }

  /// Start the linked executable without waiting for it.
  pub fn native_spawn(&self) -> Result<LineStream, BuildError> {
    let target = self.target()?;
    target.run(&self.paths()?, &self.config.app_name())
  }

  /// Fetch dependencies, compile the glue and the image, then link.
  ///
  /// Stops at the first stage that fails.
  pub async fn native_build(&self, class_path: &str) -> Result<bool, BuildError> {
    let target = self.target()?;
    let paths = self.paths()?;
    let class_path = split_class_path(class_path);
    let started = Instant::now();

    setup_dependencies(self.config).await?;

    let ok = target.compile_additional_sources(&paths, self.config).await?
      && target.compile(&paths, self.config, &class_path).await?
      && target.link(&paths, self.config).await?;

    if ok {
      info!(
        app = %paths.app_path(&self.config.app_name()).display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build finished"
      );
    } else {
      warn!(target = %self.config.target, "build failed");
    }
    Ok(ok)
  }
}

/// Compile with the default diagnostics sink.
pub async fn native_compile(config: &ProjectConfiguration, class_path: &str) -> Result<bool, BuildError> {
  Dispatcher::new(config).native_compile(class_path).await
}

pub async fn native_link(config: &ProjectConfiguration) -> Result<bool, BuildError> {
  Dispatcher::new(config).native_link().await
}

pub async fn native_run(config: &ProjectConfiguration) -> Result<bool, BuildError> {
  Dispatcher::new(config).native_run().await
}

pub async fn native_build(config: &ProjectConfiguration, class_path: &str) -> Result<bool, BuildError> {
  Dispatcher::new(config).native_build(class_path).await
}
