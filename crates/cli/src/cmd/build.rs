//! Implementation of the `substrate build` command.
//!
//! Runs the whole pipeline: fetch dependencies, compile the glue sources,
//! compile the image, link.

use std::time::Instant;

use anyhow::{Context, Result};
use substrate_lib::dispatch::Dispatcher;
use substrate_lib::target::ProcessPaths;

use crate::cmd::{GlobalArgs, SourceArgs, apply_source_args, load_config, runtime};
use crate::output::{OutputFormat, Stage, StageReport};

pub fn cmd_build(global: &GlobalArgs, source: &SourceArgs, output: OutputFormat) -> Result<bool> {
  let mut config = load_config(global)?;
  let class_path = apply_source_args(&mut config, source)?;
  let start = Instant::now();

  let ok = runtime()?
    .block_on(Dispatcher::new(&config).native_build(&class_path))
    .context("Build failed")?;

  let app = ProcessPaths::new(&config.build_root, &config.target).app_path(&config.app_name());
  StageReport::new(Stage::Build, ok, config.app_name(), config.target, start.elapsed())
    .with_artifact(&app)
    .print(output)?;
  Ok(ok)
}
