use std::fmt::{self, Write as _};
use std::io::Write;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::report::{Severity, Violation};

/// Text sink for rendered violations.
///
/// Each call carries one complete unit of text, possibly spanning several
/// lines. Implementations must never interleave two units.
pub trait StringLogger: Send + Sync {
    /// Emits one unit of text.
    fn log_message(&self, message: &str);
}

/// Writes each unit, newline terminated, to an [`io::Write`](std::io::Write).
pub struct WriterLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterLogger<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> StringLogger for WriterLogger<W> {
    fn log_message(&self, message: &str) {
        let mut writer = self.writer.lock();
        let result = writer
            .write_all(message.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        if let Err(err) = result {
            warn!(error = %err, "consistency.logger.write_failed");
        }
    }
}

/// Keeps every unit in memory.
#[derive(Debug, Default)]
pub struct InMemoryLogger {
    messages: Mutex<Vec<String>>,
}

impl InMemoryLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Units logged so far, in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Everything logged so far, each unit newline terminated.
    pub fn text(&self) -> String {
        self.messages
            .lock()
            .iter()
            .fold(String::new(), |mut text, message| {
                text.push_str(message);
                text.push('\n');
                text
            })
    }
}

impl StringLogger for InMemoryLogger {
    fn log_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Forwards each unit as one `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl StringLogger for TracingLogger {
    fn log_message(&self, message: &str) {
        info!(target: "sombra_consistency::report", "{message}");
    }
}

/// Receives the violations of one record at a time.
pub trait ConsistencyLogger: Send + Sync {
    /// Renders the violations of a single record as one unit.
    fn log(&self, violations: &[Violation]);
}

/// Renders violations in the line-oriented format external tooling parses:
///
/// ```text
/// ERROR: <message>
/// <TAB><record>                 (or "- <prior>" and "+ <record>")
/// <TAB>Inconsistent with: <id> <id> ...
/// ```
pub struct MessageConsistencyLogger<'a> {
    sink: &'a dyn StringLogger,
}

impl<'a> MessageConsistencyLogger<'a> {
    /// Renders into `sink`.
    pub fn new(sink: &'a dyn StringLogger) -> Self {
        Self { sink }
    }

    /// Logs an error about a record.
    pub fn error(
        &self,
        record: &dyn fmt::Display,
        message: &str,
        references: &[u64],
    ) {
        self.emit(Severity::Error, None, record, message, references);
    }

    /// Logs an error about a record that changed during the run.
    pub fn changed_error(
        &self,
        old: &dyn fmt::Display,
        new: &dyn fmt::Display,
        message: &str,
        references: &[u64],
    ) {
        self.emit(Severity::Error, Some(old), new, message, references);
    }

    /// Logs a warning about a record.
    pub fn warning(
        &self,
        record: &dyn fmt::Display,
        message: &str,
        references: &[u64],
    ) {
        self.emit(Severity::Warning, None, record, message, references);
    }

    /// Logs a warning about a record that changed during the run.
    pub fn changed_warning(
        &self,
        old: &dyn fmt::Display,
        new: &dyn fmt::Display,
        message: &str,
        references: &[u64],
    ) {
        self.emit(Severity::Warning, Some(old), new, message, references);
    }

    fn emit(
        &self,
        severity: Severity,
        old: Option<&dyn fmt::Display>,
        new: &dyn fmt::Display,
        message: &str,
        references: &[u64],
    ) {
        let mut buffer = String::new();
        format_into(&mut buffer, severity, message, old, new, references);
        self.sink.log_message(&buffer);
    }
}

impl ConsistencyLogger for MessageConsistencyLogger<'_> {
    fn log(&self, violations: &[Violation]) {
        let mut buffer = String::new();
        for violation in violations {
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            let prior = violation.prior.as_ref().map(|p| p as &dyn fmt::Display);
            format_into(
                &mut buffer,
                violation.severity(),
                &violation.inconsistency.to_string(),
                prior,
                &violation.record,
                &violation.references,
            );
        }
        if !buffer.is_empty() {
            self.sink.log_message(&buffer);
        }
    }
}

fn format_into(
    buffer: &mut String,
    severity: Severity,
    message: &str,
    old: Option<&dyn fmt::Display>,
    new: &dyn fmt::Display,
    references: &[u64],
) {
    // Writing into a String cannot fail.
    let _ = write!(buffer, "{}: {message}", severity.label());
    match old {
        Some(old) => {
            let _ = write!(buffer, "\n\t- {old}\n\t+ {new}");
        }
        None => {
            let _ = write!(buffer, "\n\t{new}");
        }
    }
    buffer.push_str("\n\tInconsistent with:");
    for id in references {
        let _ = write!(buffer, " {id}");
    }
}
