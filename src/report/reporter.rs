//! Reporter adapters.
//!
//! A reporter accepts complete report snapshots and a final stop signal.
//! Which adapters run is decided by configuration when the publisher is
//! built.

use std::io::Write;

use chrono::Utc;

use super::{BenchmarkReport, MarkdownRenderer, ReportSnapshot};
use crate::error::{BenchError, Result};

pub trait Reporter: Send {
    fn name(&self) -> &'static str;

    /// Accept one snapshot. `finished` is set on the terminal snapshot only.
    ///
    /// # Errors
    ///
    /// Returns `Reporter` when delivery fails. The publisher logs it and
    /// keeps going.
    fn report(&mut self, report: &BenchmarkReport, finished: bool) -> Result<()>;

    /// Called when the run failed fatally, after the last snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Reporter` when the failure notice cannot be delivered.
    fn report_error(&mut self, _error: &str) -> Result<()> {
        Ok(())
    }

    /// Called once after the last snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Reporter` when final delivery fails.
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

fn delivery_error(reporter: &str, err: impl std::fmt::Display) -> BenchError {
    BenchError::Reporter {
        reporter: reporter.to_string(),
        reason: err.to_string(),
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn report(&mut self, _report: &BenchmarkReport, _finished: bool) -> Result<()> {
        Ok(())
    }
}

/// Prints the final report as markdown.
pub struct ConsoleReporter {
    renderer: MarkdownRenderer,
    out: Box<dyn Write + Send>,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(renderer: MarkdownRenderer, out: Box<dyn Write + Send>) -> Self {
        Self { renderer, out }
    }

    #[must_use]
    pub fn stdout(renderer: MarkdownRenderer) -> Self {
        Self::new(renderer, Box::new(std::io::stdout()))
    }
}

impl Reporter for ConsoleReporter {
    fn name(&self) -> &'static str {
        "console"
    }

    fn report(&mut self, report: &BenchmarkReport, finished: bool) -> Result<()> {
        if !finished {
            return Ok(());
        }
        let body = self.renderer.render(report, true);
        self.out
            .write_all(body.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| delivery_error(self.name(), e))
    }
}

/// Appends one JSON snapshot per line.
pub struct JsonLinesReporter {
    out: Box<dyn Write + Send>,
}

impl JsonLinesReporter {
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }
}

impl Reporter for JsonLinesReporter {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn report(&mut self, report: &BenchmarkReport, finished: bool) -> Result<()> {
        let snapshot = ReportSnapshot {
            finished,
            generated_at: Some(Utc::now()),
            report: report.clone(),
        };
        let mut line = serde_json::to_vec(&snapshot)?;
        line.push(b'\n');
        self.out
            .write_all(&line)
            .and_then(|()| self.out.flush())
            .map_err(|e| delivery_error(self.name(), e))
    }

    fn stop(&mut self) -> Result<()> {
        self.out.flush().map_err(|e| delivery_error(self.name(), e))
    }
}
