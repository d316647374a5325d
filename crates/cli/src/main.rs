mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use substrate_lib::platform::Triplet;
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// substrate - ahead-of-time native builds for JVM applications
#[derive(Parser)]
#[command(name = "substrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project configuration file (default: ./substrate.toml if present)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Target triplet, e.g. x86_64-linux (default: from config, else host)
  #[arg(short, long, global = true)]
  target: Option<Triplet>,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Download and verify the static libraries the build needs
  Deps,

  /// Compile classes to a native object with native-image
  Compile(cmd::SourceArgs),

  /// Link the compiled object into an executable
  Link,

  /// Run the linked executable
  Run,

  /// Fetch dependencies, compile and link in one go
  Build(cmd::SourceArgs),

  /// Show host, target and cache information
  Info,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

/// Dispatch to the selected command. `Ok(false)` means a build stage failed
/// and its output has already been shown.
fn run(cli: Cli) -> Result<bool> {
  let global = cmd::GlobalArgs {
    verbose: cli.verbose,
    config: cli.config,
    target: cli.target,
  };

  match cli.command {
    Commands::Deps => cmd::cmd_deps(&global, cli.output),
    Commands::Compile(source) => cmd::cmd_compile(&global, &source, cli.output),
    Commands::Link => cmd::cmd_link(&global, cli.output),
    Commands::Run => cmd::cmd_run(&global, cli.output),
    Commands::Build(source) => cmd::cmd_build(&global, &source, cli.output),
    Commands::Info => cmd::cmd_info(&global, cli.output),
  }
}
