//! Implementation of the `substrate deps` command.

use std::time::Instant;

use anyhow::{Context, Result};
use substrate_lib::cache::{DependencyCache, required_bundles};

use crate::cmd::{GlobalArgs, load_config, runtime};
use crate::output::{BundleStatus, OutputFormat, print_bundles, print_note};

/// Make sure every bundle the configuration needs is cached and valid.
pub fn cmd_deps(global: &GlobalArgs, output: OutputFormat) -> Result<bool> {
  let config = load_config(global)?;
  let start = Instant::now();
  let bundles = required_bundles(&config);

  if bundles.is_empty() && !output.is_json() {
    print_note("No bundles to fetch; configured library roots are used as-is");
    return Ok(true);
  }

  let cache = DependencyCache::new(&config.cache_root);
  let rt = runtime()?;
  let mut report = Vec::with_capacity(bundles.len());

  for bundle in &bundles {
    let ensured = rt
      .block_on(cache.ensure(bundle, config.target.os, config.enable_check_hash))
      .with_context(|| format!("Failed to fetch {} {}", bundle.folder, bundle.version))?;
    report.push(BundleStatus::new(
      bundle,
      ensured,
      bundle.files_dir(cache.root(), config.target.os),
    ));
  }

  print_bundles(&report, start.elapsed(), global.verbose, output)?;
  Ok(true)
}
