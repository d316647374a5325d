//! Live, line-buffered access to a running process.

use std::io::{BufRead, PipeReader};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::process::{ProcessError, ProcessOutput};

/// Output lines of a running process.
///
/// The stream owns the child process. When stderr is merged both streams
/// share one pipe, so lines are delivered in the order the child wrote them.
/// The stream ends once the output reached EOF.
#[derive(Debug)]
pub struct LineStream {
  program: PathBuf,
  child: Child,
  lines: mpsc::UnboundedReceiver<String>,
  readers: Vec<JoinHandle<()>>,
}

impl LineStream {
  /// Read output from `merged` when given, otherwise from the child's stdout pipe.
  pub(crate) fn new(program: PathBuf, mut child: Child, merged: Option<PipeReader>) -> Self {
    let (tx, lines) = mpsc::unbounded_channel();
    let mut readers = Vec::with_capacity(1);

    match merged {
      Some(pipe) => readers.push(forward_pipe_lines(pipe, tx)),
      None => {
        if let Some(stdout) = child.stdout.take() {
          readers.push(forward_lines(stdout, tx));
        }
      }
    }

    Self {
      program,
      child,
      lines,
      readers,
    }
  }

  /// OS process id, if the process has not been reaped yet.
  pub fn id(&self) -> Option<u32> {
    self.child.id()
  }

  /// Next output line, or `None` once all output has been read.
  pub async fn next_line(&mut self) -> Option<String> {
    self.lines.recv().await
  }

  /// Wait for the process to exit and return its exit code.
  ///
  /// Lines not yet consumed are discarded. The pipes keep being drained
  /// until the process exits so a chatty child never blocks on a full pipe.
  pub async fn wait(self) -> Result<Option<i32>, ProcessError> {
    let LineStream {
      program,
      mut child,
      lines: _lines,
      readers,
    } = self;

    let status = match child.wait().await {
      Ok(status) => status,
      Err(source) => {
        abort_readers(&readers);
        return Err(ProcessError::Wait { program, source });
      }
    };
    join_readers(&program, readers).await?;
    Ok(status.code())
  }

  /// Read all remaining output, then wait for the exit code.
  pub async fn collect(mut self) -> Result<ProcessOutput, ProcessError> {
    let mut output = String::new();
    while let Some(line) = self.next_line().await {
      output.push_str(&line);
      output.push('\n');
    }
    let exit_code = self.wait().await?;
    Ok(ProcessOutput { exit_code, output })
  }

  pub(crate) fn into_parts(self) -> (PathBuf, Child, mpsc::UnboundedReceiver<String>, Vec<JoinHandle<()>>) {
    (self.program, self.child, self.lines, self.readers)
  }
}

/// Wait for every reader to finish draining its pipe.
pub(crate) async fn join_readers(program: &Path, readers: Vec<JoinHandle<()>>) -> Result<(), ProcessError> {
  for reader in readers {
    reader.await.map_err(|e| ProcessError::Forward {
      program: program.to_path_buf(),
      message: e.to_string(),
    })?;
  }
  Ok(())
}

/// Abort readers that will not be joined.
///
/// A reader already blocked on the merged pipe finishes on its own once the
/// pipe closes or the line receiver is dropped.
pub(crate) fn abort_readers(readers: &[JoinHandle<()>]) {
  for reader in readers {
    reader.abort();
  }
}

/// Forward every line of an async `reader` into `tx` until EOF.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()>
where
  R: AsyncRead + Unpin + Send + 'static,
{
  tokio::spawn(async move {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
      buf.clear();
      match reader.read_until(b'\n', &mut buf).await {
        Ok(0) | Err(_) => break,
        Ok(_) => {
          if tx.send(decode_line(&mut buf)).is_err() {
            break;
          }
        }
      }
    }
  })
}

/// Forward every line of the shared stdout/stderr pipe into `tx` until EOF.
///
/// Anonymous pipes have no async reader, so this one runs on the blocking pool.
fn forward_pipe_lines(pipe: PipeReader, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
  tokio::task::spawn_blocking(move || {
    let mut reader = std::io::BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
      buf.clear();
      match reader.read_until(b'\n', &mut buf) {
        Ok(0) | Err(_) => break,
        Ok(_) => {
          if tx.send(decode_line(&mut buf)).is_err() {
            break;
          }
        }
      }
    }
  })
}

/// Strip the line ending and decode lossily so non-UTF-8 output is never dropped.
fn decode_line(buf: &mut Vec<u8>) -> String {
  while matches!(buf.last(), Some(b'\n' | b'\r')) {
    buf.pop();
  }
  String::from_utf8_lossy(buf).into_owned()
}
