//! Command reporting.
//!
//! Every command ends with a report: a [`StageReport`] for the pipeline
//! commands, a list of [`BundleStatus`] lines for `deps`. Text goes to the
//! terminal (failures on stderr, below the failing tool's output); `--output
//! json` prints the same report as one JSON document on stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use substrate_lib::cache::{BundleDescriptor, Ensured};
use substrate_lib::platform::Triplet;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const PASS: &str = "✓";
const FAIL: &str = "✗";
const NOTE: &str = "•";

/// Elapsed time as `840ms`, `12.4s` or `3m07s`.
pub fn format_elapsed(elapsed: Duration) -> String {
  let millis = elapsed.as_millis();
  match millis {
    0..1_000 => format!("{}ms", millis),
    1_000..60_000 => format!("{:.1}s", elapsed.as_secs_f64()),
    _ => format!("{}m{:02}s", elapsed.as_secs() / 60, elapsed.as_secs() % 60),
  }
}

/// The pipeline step a command drove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  Compile,
  Link,
  Run,
  Build,
}

impl Stage {
  fn done(self) -> &'static str {
    match self {
      Stage::Compile => "Compiled",
      Stage::Link => "Linked",
      Stage::Run => "Finished",
      Stage::Build => "Built",
    }
  }

  fn failed(self) -> &'static str {
    match self {
      Stage::Compile => "Compile failed",
      Stage::Link => "Link failed",
      Stage::Run => "Run failed: the application exited with an error",
      Stage::Build => "Build failed",
    }
  }
}

/// Outcome of a pipeline command.
#[derive(Debug, Serialize)]
pub struct StageReport {
  pub stage: Stage,
  pub ok: bool,
  /// Main class or application the stage worked on.
  pub subject: String,
  pub target: Triplet,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifact: Option<PathBuf>,
  pub duration_ms: u64,
}

impl StageReport {
  pub fn new(stage: Stage, ok: bool, subject: impl Into<String>, target: Triplet, elapsed: Duration) -> Self {
    Self {
      stage,
      ok,
      subject: subject.into(),
      target,
      artifact: None,
      duration_ms: elapsed.as_millis() as u64,
    }
  }

  /// Record the produced executable. Ignored for failed stages.
  pub fn with_artifact(mut self, path: &Path) -> Self {
    if self.ok {
      self.artifact = Some(path.to_path_buf());
    }
    self
  }

  pub fn headline(&self) -> String {
    if self.ok {
      format!("{} {}", self.stage.done(), self.subject)
    } else {
      self.stage.failed().to_string()
    }
  }

  pub fn print(&self, format: OutputFormat) -> anyhow::Result<()> {
    if format.is_json() {
      return print_json(self);
    }
    if !self.ok {
      print_error(&self.headline());
      return Ok(());
    }

    println!("{} {}", PASS.if_supports_color(Stream::Stdout, |s| s.green()), self.headline());
    // Runs report the application's own output; a summary block would only add noise.
    if self.stage != Stage::Run {
      print_stat("Target", &self.target.to_string());
      if let Some(artifact) = &self.artifact {
        print_stat("Executable", &artifact.display().to_string());
      }
      print_stat("Duration", &format_elapsed(Duration::from_millis(self.duration_ms)));
    }
    Ok(())
  }
}

/// State of one cached bundle after `deps`.
#[derive(Debug, Serialize)]
pub struct BundleStatus {
  pub folder: String,
  pub version: String,
  pub path: PathBuf,
  pub downloaded: bool,
}

impl BundleStatus {
  pub fn new(bundle: &BundleDescriptor, ensured: Ensured, path: PathBuf) -> Self {
    Self {
      folder: bundle.folder.clone(),
      version: bundle.version.clone(),
      path,
      downloaded: ensured == Ensured::Downloaded,
    }
  }

  pub fn headline(&self) -> String {
    let state = if self.downloaded { "downloaded" } else { "cached" };
    format!("{} {} ({})", self.folder, self.version, state)
  }
}

/// Print the bundle lines of `deps`, with paths when `verbose`.
pub fn print_bundles(
  bundles: &[BundleStatus],
  elapsed: Duration,
  verbose: bool,
  format: OutputFormat,
) -> anyhow::Result<()> {
  if format.is_json() {
    return print_json(&serde_json::json!({ "bundles": bundles }));
  }
  for bundle in bundles {
    println!("{} {}", PASS.if_supports_color(Stream::Stdout, |s| s.green()), bundle.headline());
    if verbose {
      print_stat("Path", &bundle.path.display().to_string());
    }
  }
  print_stat("Duration", &format_elapsed(elapsed));
  Ok(())
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    FAIL.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_note(message: &str) {
  println!("{} {}", NOTE.if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
  println!("{}", json);
  Ok(())
}
