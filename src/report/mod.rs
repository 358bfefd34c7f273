//! Reporting of completed windows: the local activity log and remote delivery.

pub mod reporter;
pub mod sink;
pub mod transport;

// Re-export commonly used types
pub use reporter::{ReportError, Reporter, SnapshotReporter};
pub use sink::LineSink;
pub use transport::{EndpointConfig, HttpTransport, Transport, TransportError, POST_EVENT_PATH};
