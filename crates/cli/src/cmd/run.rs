//! Implementation of the `substrate run` command.

use std::time::Instant;

use anyhow::{Context, Result};
use substrate_lib::dispatch::Dispatcher;

use crate::cmd::{GlobalArgs, load_config, runtime};
use crate::output::{OutputFormat, Stage, StageReport};

/// Run the linked executable, streaming its output to stderr.
pub fn cmd_run(global: &GlobalArgs, output: OutputFormat) -> Result<bool> {
  let config = load_config(global)?;
  let start = Instant::now();

  let ok = runtime()?
    .block_on(Dispatcher::new(&config).native_run())
    .context("Run failed")?;

  // Text mode stays quiet on success; the application's output is the result.
  if !ok || output.is_json() {
    StageReport::new(Stage::Run, ok, config.app_name(), config.target, start.elapsed()).print(output)?;
  }
  Ok(ok)
}
