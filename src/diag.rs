
use log::*;

// ------------------------------------------------------------------------------------------------
// DiagSink
// ------------------------------------------------------------------------------------------------

/// Where the dead store pass reports its findings. One call per confirmed dead store; the pass
/// never writes to any output stream directly.
pub trait DiagSink {
	/// Report one finding.
	fn line(&mut self, line: &str);
}

// ------------------------------------------------------------------------------------------------
// LogSink
// ------------------------------------------------------------------------------------------------

/// A sink that forwards findings to the `log` facade at info level.
pub struct LogSink;

impl DiagSink for LogSink {
	fn line(&mut self, line: &str) {
		info!("{}", line);
	}
}

// ------------------------------------------------------------------------------------------------
// Capture
// ------------------------------------------------------------------------------------------------

/// A sink that remembers every finding, for tests and batch consumers.
#[derive(Default)]
pub struct Capture {
	lines: Vec<String>,
}

impl Capture {
	///
	pub fn new() -> Self {
		Self::default()
	}

	/// Everything reported so far, in report order.
	pub fn lines(&self) -> &[String] {
		&self.lines
	}
}

impl DiagSink for Capture {
	fn line(&mut self, line: &str) {
		self.lines.push(line.into());
	}
}
