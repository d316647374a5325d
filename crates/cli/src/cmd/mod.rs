mod build;
mod compile;
mod deps;
mod info;
mod link;
mod run;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use substrate_lib::config::ProjectConfiguration;
use substrate_lib::consts::CONFIG_FILE;
use substrate_lib::platform::Triplet;
use tracing::debug;

pub use build::cmd_build;
pub use compile::cmd_compile;
pub use deps::cmd_deps;
pub use info::cmd_info;
pub use link::cmd_link;
pub use run::cmd_run;

/// Flags shared by every command.
pub struct GlobalArgs {
  pub verbose: bool,
  pub config: Option<PathBuf>,
  pub target: Option<Triplet>,
}

/// What to compile, overriding the configuration file.
#[derive(Debug, Args)]
pub struct SourceArgs {
  /// Fully qualified main class
  #[arg(short, long)]
  pub main_class: Option<String>,

  /// Class path, separated by the platform path separator
  #[arg(long = "class-path", visible_alias = "cp")]
  pub class_path: Option<String>,
}

/// Load the project configuration and apply command-line overrides.
///
/// Without `--config`, `./substrate.toml` is used when it exists and built-in
/// defaults otherwise.
pub fn load_config(global: &GlobalArgs) -> Result<ProjectConfiguration> {
  let config = match &global.config {
    Some(path) => ProjectConfiguration::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
    None => {
      let default_path = PathBuf::from(CONFIG_FILE);
      if default_path.is_file() {
        ProjectConfiguration::load(&default_path).with_context(|| format!("Failed to load {}", CONFIG_FILE))?
      } else {
        debug!("no {} found, using defaults", CONFIG_FILE);
        ProjectConfiguration::default()
      }
    }
  };

  let mut config = config.with_env_fallbacks();
  if let Some(target) = global.target {
    config.target = target;
  }
  config.verbose |= global.verbose;
  Ok(config)
}

/// Apply source overrides and return the class path to compile.
pub fn apply_source_args(config: &mut ProjectConfiguration, source: &SourceArgs) -> Result<String> {
  if let Some(main_class) = &source.main_class {
    config.main_class = main_class.clone();
  }
  if let Some(class_path) = &source.class_path {
    config.class_path = Some(class_path.clone());
  }
  match &config.class_path {
    Some(class_path) => Ok(class_path.clone()),
    None => bail!("No class path given. Pass --class-path or set class_path in {}", CONFIG_FILE),
  }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
