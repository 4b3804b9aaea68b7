use std::io::Write;
use tracing::{debug, trace, warn};

/// Sink for the human-readable lines a long-running action streams back to
/// whoever started it.
///
/// Reporting is best effort. Implementations log and drop their own write
/// errors.
pub trait ProgressReporter {
    /// Delivers one line of progress.
    ///
    /// # Arguments
    /// * `msg`: A single line, without a trailing newline.
    fn progress(&mut self, msg: &str);
}

/// Keeps an external watchdog from cancelling an operation that is still
/// making progress.
///
/// The explorer calls this before every request it sends to the device, so
/// each transaction gets the full allowance.
pub trait DeadlineExtender {
    /// Allows the operation at least `seconds` more from now.
    ///
    /// # Arguments
    /// * `seconds`: The new allowance, counted from the time of the call.
    fn extend(&mut self, seconds: u64);
}

/// Writes each progress message as one line to `W`.
#[derive(Debug)]
pub struct WriterProgress<W: Write> {
    writer: W,
}

impl<W: Write> WriterProgress<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ProgressReporter for WriterProgress<W> {
    fn progress(&mut self, msg: &str) {
        debug!(target: "pioneer::progress", "{msg}");
        if let Err(e) = writeln!(self.writer, "{msg}").and_then(|()| self.writer.flush()) {
            warn!(error = %e, "failed to write progress message");
        }
    }
}

/// Collects every progress message in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub messages: Vec<String>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn progress(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }
}

/// For runs without a watchdog, such as the command line front-end.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeadline;

impl DeadlineExtender for NoDeadline {
    fn extend(&mut self, seconds: u64) {
        trace!(seconds, "no watchdog to extend");
    }
}

/// Remembers every requested extension.
#[derive(Debug, Default, Clone)]
pub struct RecordingDeadline {
    pub extensions: Vec<u64>,
}

impl RecordingDeadline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeadlineExtender for RecordingDeadline {
    fn extend(&mut self, seconds: u64) {
        self.extensions.push(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_progress_emits_one_line_per_message() {
        let mut progress = WriterProgress::new(Vec::new());
        progress.progress("Transition 1/2: a ==> b");
        progress.progress("   transaction-failed");
        let written = String::from_utf8(progress.into_inner()).unwrap();
        assert_eq!(written, "Transition 1/2: a ==> b\n   transaction-failed\n");
    }

    #[test]
    fn recorders_keep_order() {
        let mut progress = RecordingProgress::new();
        progress.progress("one");
        progress.progress("two");
        assert_eq!(progress.messages, vec!["one", "two"]);

        let mut deadline = RecordingDeadline::new();
        deadline.extend(120);
        deadline.extend(30);
        assert_eq!(deadline.extensions, vec![120, 30]);
    }
}
