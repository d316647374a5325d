//! Destinations for process diagnostics.

use std::fmt;
use std::sync::Arc;

/// Receives output lines forwarded from external processes.
///
/// Cloning is cheap; all clones write to the same destination. The default
/// sink writes to the standard error stream of the current process.
#[derive(Clone)]
pub struct OutputSink(Arc<dyn Fn(&str) + Send + Sync>);

impl OutputSink {
  /// Wrap a closure as a sink.
  pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
    Self(Arc::new(f))
  }

  /// Sink writing every line to stderr.
  pub fn stderr() -> Self {
    Self::new(|line| eprintln!("{}", line))
  }

  /// Sink that discards everything.
  pub fn null() -> Self {
    Self::new(|_| {})
  }

  pub fn emit(&self, line: &str) {
    (self.0)(line)
  }

  /// Emit every line of a captured block of text.
  pub fn dump(&self, text: &str) {
    for line in text.lines() {
      self.emit(line);
    }
  }
}

impl Default for OutputSink {
  fn default() -> Self {
    Self::stderr()
  }
}

impl fmt::Debug for OutputSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("OutputSink")
  }
}
