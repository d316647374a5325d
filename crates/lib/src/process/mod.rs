//! External process execution.
//!
//! Every toolchain stage shells out through [`ProcessRunner`]. A non-zero exit
//! code is reported as data in [`ProcessOutput`]; only failing to launch or to
//! wait for the process is an error.

mod sink;
mod stream;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

pub use sink::OutputSink;
pub use stream::LineStream;

/// Errors that prevent a process from producing an exit code.
#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to launch {}: {source}", program.display())]
  Launch {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed waiting for {}: {source}", program.display())]
  Wait {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("output forwarding task for {} failed: {message}", program.display())]
  Forward { program: PathBuf, message: String },
}

/// Exit code and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
  /// `None` when the process was terminated by a signal.
  pub exit_code: Option<i32>,
  pub output: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }
}

/// Builder for a single external process invocation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
  program: PathBuf,
  args: Vec<OsString>,
  current_dir: Option<PathBuf>,
  merge_stderr: bool,
}

impl ProcessRunner {
  /// Prepare to run `program`. Stderr is merged into the captured output by default.
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      current_dir: None,
      merge_stderr: true,
    }
  }

  pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
    self.args.push(arg.as_ref().to_os_string());
    self
  }

  pub fn args<I, S>(&mut self, args: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    for arg in args {
      self.arg(arg);
    }
    self
  }

  pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
    self.current_dir = Some(dir.as_ref().to_path_buf());
    self
  }

  /// When `false`, stderr is inherited from the current process instead of captured.
  pub fn merge_stderr(&mut self, merge: bool) -> &mut Self {
    self.merge_stderr = merge;
    self
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  pub fn get_args(&self) -> &[OsString] {
    &self.args
  }

  /// Human readable command line, for logs only.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_os_str())
      .chain(self.args.iter().map(OsString::as_os_str))
      .map(|part| part.to_string_lossy())
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Start the process and return a live line stream without waiting for it.
  ///
  /// With stderr merged, stdout and stderr are both the write end of a single
  /// pipe, so the child's writes keep their order.
  pub fn spawn_lines(&self) -> Result<LineStream, ProcessError> {
    let launch_err = |source| ProcessError::Launch {
      program: self.program.clone(),
      source,
    };

    let mut command = Command::new(&self.program);
    command.args(&self.args).stdin(Stdio::null());
    if let Some(dir) = &self.current_dir {
      command.current_dir(dir);
    }

    let merged = if self.merge_stderr {
      let (reader, writer) = std::io::pipe().map_err(launch_err)?;
      let stderr_writer = writer.try_clone().map_err(launch_err)?;
      command.stdout(writer).stderr(stderr_writer);
      Some(reader)
    } else {
      command.stdout(Stdio::piped()).stderr(Stdio::inherit());
      None
    };

    debug!(command = %self.command_line(), working_dir = ?self.current_dir, "spawning process");

    let child = command.spawn().map_err(launch_err)?;
    // The command holds the parent's copies of the write end; EOF only
    // arrives once they are closed.
    drop(command);
    Ok(LineStream::new(self.program.clone(), child, merged))
  }

  /// Run to completion, capturing output.
  pub async fn run(&self) -> Result<ProcessOutput, ProcessError> {
    let output = self.spawn_lines()?.collect().await?;
    debug!(program = %self.program.display(), exit_code = ?output.exit_code, "process finished");
    Ok(output)
  }

  /// Run to completion while forwarding each line to `sink` as it arrives.
  ///
  /// A dedicated task drains the output while this task waits on the process
  /// handle. That task is always joined (or aborted) before returning.
  pub async fn run_streaming(&self, sink: &OutputSink) -> Result<ProcessOutput, ProcessError> {
    let (program, mut child, mut lines, readers) = self.spawn_lines()?.into_parts();

    let forward_sink = sink.clone();
    let forwarder = tokio::spawn(async move {
      let mut captured = String::new();
      while let Some(line) = lines.recv().await {
        forward_sink.emit(&line);
        captured.push_str(&line);
        captured.push('\n');
      }
      captured
    });

    let status = match child.wait().await {
      Ok(status) => status,
      Err(source) => {
        stream::abort_readers(&readers);
        forwarder.abort();
        return Err(ProcessError::Wait { program, source });
      }
    };
    if let Err(e) = stream::join_readers(&program, readers).await {
      forwarder.abort();
      return Err(e);
    }

    let output = forwarder.await.map_err(|e| ProcessError::Forward {
      program: program.clone(),
      message: e.to_string(),
    })?;

    info!(program = %program.display(), exit_code = ?status.code(), "process finished");
    Ok(ProcessOutput {
      exit_code: status.code(),
      output,
    })
  }
}
