//! Implementation of the `substrate compile` command.

use std::time::Instant;

use anyhow::{Context, Result};
use substrate_lib::dispatch::Dispatcher;

use crate::cmd::{GlobalArgs, SourceArgs, apply_source_args, load_config, runtime};
use crate::output::{OutputFormat, Stage, StageReport};

pub fn cmd_compile(global: &GlobalArgs, source: &SourceArgs, output: OutputFormat) -> Result<bool> {
  let mut config = load_config(global)?;
  let class_path = apply_source_args(&mut config, source)?;
  let start = Instant::now();

  let ok = runtime()?
    .block_on(Dispatcher::new(&config).native_compile(&class_path))
    .context("Compile failed")?;

  StageReport::new(Stage::Compile, ok, config.main_class.clone(), config.target, start.elapsed()).print(output)?;
  Ok(ok)
}
