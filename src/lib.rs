//! keymon - lightweight keyboard and mouse activity monitor.
//!
//! Reads raw input device streams, counts keyboard and mouse activity over
//! fixed windows, appends each window to a local log and reports it to a
//! remote HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             keymon                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐             │
//! │  │  Collector  │──▶│ Classifier  │──▶│   Window    │             │
//! │  │ (evdev, N)  │   │ (debounce)  │   │ (interval)  │             │
//! │  └─────────────┘   └─────────────┘   └─────────────┘             │
//! │         ▲                                   │ boundary           │
//! │         │ poll                              ▼                    │
//! │  ┌─────────────┐                     ┌─────────────┐             │
//! │  │  Poll loop  │────────────────────▶│  Reporter   │──▶ log, HTTP│
//! │  └─────────────┘                     └─────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use keymon::collector::DeviceSet;
//! use keymon::core::{MonitorLoop, SystemClock};
//! use keymon::report::{EndpointConfig, HttpTransport, LineSink, Reporter};
//! use keymon::Config;
//! use std::sync::atomic::AtomicBool;
//!
//! let config = Config::default();
//! let sources = DeviceSet::open_all(&config.device_paths).expect("no devices");
//! let endpoint = EndpointConfig::new(config.remote_endpoint.clone(), config.request_timeout());
//! let reporter = Reporter::new(
//!     LineSink::open(&config.sink_path, false).expect("sink"),
//!     HttpTransport::new(endpoint.timeout).expect("transport"),
//!     endpoint.post_event_url(),
//! );
//!
//! let mut monitor = MonitorLoop::new(sources, SystemClock::new(), reporter, &config.loop_settings());
//! monitor.run(&AtomicBool::new(true));
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod logging;
pub mod report;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use collector::{CollectorError, EventSourceSet, RawInputEvent, SourceId};
pub use config::{Config, ConfigError};
pub use core::{AggregationWindow, Classifier, MonitorLoop, ReportSnapshot};
pub use report::{ReportError, Reporter, SnapshotReporter, TransportError};
pub use stats::{ActivityStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
