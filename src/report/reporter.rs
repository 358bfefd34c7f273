//! Reporting of completed windows.
//!
//! Each snapshot is appended to the local sink and delivered to the remote
//! endpoint. The two effects are independent: either can fail without
//! preventing the other, and neither failure reaches past the reporter as
//! anything but a returned error that has already been logged.
//!
//! Both run on the calling thread. Reports are seconds apart, so the extra
//! latency is acceptable; moving delivery to a background task would only
//! need snapshots handed over by value.

use crate::core::windowing::ReportSnapshot;
use crate::report::sink::LineSink;
use crate::report::transport::{Transport, TransportError};
use std::io::Write;
use std::time::Instant;

/// Anything that can take a completed window.
pub trait SnapshotReporter {
    fn report(&mut self, snapshot: &ReportSnapshot) -> Result<(), ReportError>;
}

/// Which part of a report failed.
#[derive(Debug)]
pub enum ReportError {
    /// Appending to the local sink failed
    Sink(std::io::Error),
    /// Remote delivery failed
    Transport(TransportError),
    /// Both failed
    Both {
        sink: std::io::Error,
        transport: TransportError,
    },
}

impl ReportError {
    pub fn sink_failed(&self) -> bool {
        matches!(self, ReportError::Sink(_) | ReportError::Both { .. })
    }

    pub fn transport_failed(&self) -> bool {
        matches!(self, ReportError::Transport(_) | ReportError::Both { .. })
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Sink(e) => write!(f, "Sink write error: {e}"),
            ReportError::Transport(e) => write!(f, "Report delivery error: {e}"),
            ReportError::Both { sink, transport } => {
                write!(f, "Sink write error: {sink}; report delivery error: {transport}")
            }
        }
    }
}

impl std::error::Error for ReportError {}

/// Reports to a local line sink and a remote endpoint.
pub struct Reporter<W: Write, T: Transport> {
    sink: LineSink<W>,
    transport: T,
    url: String,
}

impl<W: Write, T: Transport> Reporter<W, T> {
    pub fn new(sink: LineSink<W>, transport: T, url: impl Into<String>) -> Self {
        Self {
            sink,
            transport,
            url: url.into(),
        }
    }

    pub fn sink(&self) -> &LineSink<W> {
        &self.sink
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<W: Write, T: Transport> SnapshotReporter for Reporter<W, T> {
    fn report(&mut self, snapshot: &ReportSnapshot) -> Result<(), ReportError> {
        let sink_result = self.sink.append(snapshot);
        if let Err(ref e) = sink_result {
            tracing::warn!(error = %e, date = %snapshot.date, "failed to append report to local sink");
        }

        let started = Instant::now();
        let transport_result = self.transport.send(&self.url, snapshot);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match transport_result {
            Ok(()) => tracing::debug!(url = %self.url, elapsed_ms, "posted report"),
            Err(ref e) => tracing::warn!(
                url = %self.url,
                status = e.status(),
                elapsed_ms,
                error = %e,
                "report delivery failed"
            ),
        }

        match (sink_result, transport_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(sink), Ok(())) => Err(ReportError::Sink(sink)),
            (Ok(()), Err(transport)) => Err(ReportError::Transport(transport)),
            (Err(sink), Err(transport)) => Err(ReportError::Both { sink, transport }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every delivery and answers with a fixed result.
    struct RecordingTransport {
        fail_with: Option<TransportError>,
        sent: RefCell<Vec<(String, ReportSnapshot)>>,
    }

    impl RecordingTransport {
        fn new(fail_with: Option<TransportError>) -> Self {
            Self {
                fail_with,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, url: &str, snapshot: &ReportSnapshot) -> Result<(), TransportError> {
            self.sent
                .borrow_mut()
                .push((url.to_string(), snapshot.clone()));
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    /// A writer that always fails.
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn snapshot() -> ReportSnapshot {
        ReportSnapshot {
            date: "2024-01-22 10:00:30".to_string(),
            keyboard_events: 5,
            mouse_events: 2,
        }
    }

    #[test]
    fn test_report_writes_and_sends() {
        let mut reporter = Reporter::new(
            LineSink::new(Vec::new(), false),
            RecordingTransport::new(None),
            "http://collector:5001/PostEvent",
        );

        reporter.report(&snapshot()).unwrap();

        assert_eq!(reporter.sink().get_ref().as_slice(), b"2024-01-22 10:00:30 5\n");
        let sent = reporter.transport().sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://collector:5001/PostEvent");
        assert_eq!(sent[0].1, snapshot());
    }

    #[test]
    fn test_transport_failure_still_writes_sink() {
        let mut reporter = Reporter::new(
            LineSink::new(Vec::new(), false),
            RecordingTransport::new(Some(TransportError::Status {
                status: 500,
                body: String::new(),
            })),
            "http://collector:5001/PostEvent",
        );

        let err = reporter.report(&snapshot()).unwrap_err();
        assert!(err.transport_failed());
        assert!(!err.sink_failed());
        assert!(!reporter.sink().get_ref().is_empty());
    }

    #[test]
    fn test_sink_failure_still_sends() {
        let mut reporter = Reporter::new(
            LineSink::new(BrokenWriter, false),
            RecordingTransport::new(None),
            "http://collector:5001/PostEvent",
        );

        let err = reporter.report(&snapshot()).unwrap_err();
        assert!(err.sink_failed());
        assert!(!err.transport_failed());
        assert_eq!(reporter.transport().sent.borrow().len(), 1);
    }

    #[test]
    fn test_both_failures_reported() {
        let mut reporter = Reporter::new(
            LineSink::new(BrokenWriter, false),
            RecordingTransport::new(Some(TransportError::Network("refused".into()))),
            "http://collector:5001/PostEvent",
        );

        let err = reporter.report(&snapshot()).unwrap_err();
        assert!(err.sink_failed() && err.transport_failed());
        assert!(err.to_string().contains("disk full"));
        assert!(err.to_string().contains("refused"));
    }
}
