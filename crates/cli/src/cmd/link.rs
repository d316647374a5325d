//! Implementation of the `substrate link` command.

use std::time::Instant;

use anyhow::{Context, Result};
use substrate_lib::dispatch::Dispatcher;
use substrate_lib::target::ProcessPaths;

use crate::cmd::{GlobalArgs, load_config, runtime};
use crate::output::{OutputFormat, Stage, StageReport};

pub fn cmd_link(global: &GlobalArgs, output: OutputFormat) -> Result<bool> {
  let config = load_config(global)?;
  let start = Instant::now();

  let ok = runtime()?
    .block_on(Dispatcher::new(&config).native_link())
    .context("Link failed")?;

  let app = ProcessPaths::new(&config.build_root, &config.target).app_path(&config.app_name());
  StageReport::new(Stage::Link, ok, config.app_name(), config.target, start.elapsed())
    .with_artifact(&app)
    .print(output)?;
  Ok(ok)
}
