//! Fan-out of report snapshots to reporters.
//!
//! Each reporter runs on its own thread behind a rendezvous channel, so a
//! slow reporter applies backpressure to the publishing loop instead of
//! buffering unbounded snapshots.

use std::sync::Arc;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::{BenchmarkReport, NoopReporter, Reporter};
use crate::error::BenchError;

enum Message {
    Snapshot {
        report: Arc<BenchmarkReport>,
        finished: bool,
    },
    Failure(Arc<str>),
}

struct ReporterHandle {
    name: &'static str,
    sender: Option<SyncSender<Message>>,
    thread: Option<JoinHandle<()>>,
}

fn spawn_reporter(mut reporter: Box<dyn Reporter>) -> ReporterHandle {
    let name = reporter.name();
    let (sender, receiver) = sync_channel::<Message>(0);
    let thread = thread::Builder::new()
        .name(format!("reporter-{name}"))
        .spawn(move || {
            for message in receiver {
                let delivered = match message {
                    Message::Snapshot { report, finished } => reporter.report(&report, finished),
                    Message::Failure(error) => reporter.report_error(&error),
                };
                if let Err(e) = delivered {
                    warn!(reporter = name, error = %e, "report delivery failed");
                }
            }
            if let Err(e) = reporter.stop() {
                warn!(reporter = name, error = %e, "reporter stop failed");
            }
            debug!(reporter = name, "reporter stopped");
        });

    match thread {
        Ok(handle) => ReporterHandle {
            name,
            sender: Some(sender),
            thread: Some(handle),
        },
        Err(e) => {
            warn!(reporter = name, error = %e, "cannot start reporter thread");
            ReporterHandle {
                name,
                sender: None,
                thread: None,
            }
        }
    }
}

/// Single producer, many consumers.
///
/// With no reporters configured a [`NoopReporter`] is attached so
/// publication always has a consumer.
pub struct ReportPublisher {
    handles: Vec<ReporterHandle>,
}

impl ReportPublisher {
    #[must_use]
    pub fn new(mut reporters: Vec<Box<dyn Reporter>>) -> Self {
        if reporters.is_empty() {
            reporters.push(Box::new(NoopReporter));
        }
        Self {
            handles: reporters.into_iter().map(spawn_reporter).collect(),
        }
    }

    /// Names of the attached reporters.
    #[must_use]
    pub fn reporter_names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|h| h.name).collect()
    }

    fn broadcast(&self, message: impl Fn() -> Message) {
        for handle in &self.handles {
            let Some(sender) = &handle.sender else {
                continue;
            };
            if sender.send(message()).is_err() {
                warn!(reporter = handle.name, "reporter is gone, dropping message");
            }
        }
    }

    fn send(&self, report: BenchmarkReport, finished: bool) {
        let report = Arc::new(report);
        self.broadcast(|| Message::Snapshot {
            report: Arc::clone(&report),
            finished,
        });
    }

    /// Publish an intermediate snapshot. Blocks until every reporter took it.
    pub fn publish(&self, report: BenchmarkReport) {
        self.send(report, false);
    }

    /// Publish the terminal snapshot.
    pub fn publish_finished(&self, report: BenchmarkReport) {
        self.send(report, true);
    }

    /// Tell every reporter that the run failed with `error`.
    pub fn publish_error(&self, error: &BenchError) {
        let error: Arc<str> = Arc::from(error.to_string());
        self.broadcast(|| Message::Failure(Arc::clone(&error)));
    }

    /// Close the channels and wait for every reporter to drain and stop.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        for handle in &mut self.handles {
            handle.sender.take();
        }
        for handle in &mut self.handles {
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    warn!(reporter = handle.name, "reporter thread panicked");
                }
            }
        }
    }
}

impl Drop for ReportPublisher {
    fn drop(&mut self) {
        self.close();
    }
}
