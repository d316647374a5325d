//! Implementation of the `substrate info` command.

use anyhow::Result;
use substrate_lib::cache::required_bundles;
use substrate_lib::platform::host_triple;

use crate::cmd::{GlobalArgs, load_config};
use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(global: &GlobalArgs, output: OutputFormat) -> Result<bool> {
  let config = load_config(global)?;
  let host = host_triple().unwrap_or_else(|| "unknown".to_string());
  let cache_root = dunce::canonicalize(&config.cache_root).unwrap_or_else(|_| config.cache_root.clone());
  let bundles: Vec<String> = required_bundles(&config)
    .iter()
    .map(|b| format!("{} {}", b.folder, b.version))
    .collect();

  if output.is_json() {
    print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "host": host,
      "target": config.target,
      "cache_root": cache_root,
      "build_root": config.build_root,
      "graalvm_home": config.graalvm_home,
      "bundles": bundles,
    }))?;
    return Ok(true);
  }

  println!("substrate v{}", env!("CARGO_PKG_VERSION"));
  println!();
  print_stat("Host", &host);
  print_stat("Target", &config.target.to_string());
  print_stat("Cache", &cache_root.display().to_string());
  print_stat("Build", &config.build_root.display().to_string());
  if !config.graalvm_home.as_os_str().is_empty() {
    print_stat("GraalVM", &config.graalvm_home.display().to_string());
  }
  if !config.main_class.is_empty() {
    print_stat("Main class", &config.main_class);
  }
  for bundle in &bundles {
    print_stat("Bundle", bundle);
  }
  Ok(true)
}
