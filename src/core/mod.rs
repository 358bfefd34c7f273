//! Core functionality for keymon.
//!
//! This module contains:
//! - Classification of raw events into keyboard and mouse activity
//! - The fixed-interval aggregation window
//! - The poll loop that ties sources, window and reporter together

pub mod classifier;
pub mod clock;
pub mod scheduler;
pub mod windowing;

// Re-export commonly used types
pub use classifier::{
    Activity, Classifier, DebounceState, DEFAULT_KEYCODE_LIMIT, DEFAULT_MOTION_DEBOUNCE_MS,
};
pub use clock::{Clock, SystemClock};
#[doc(hidden)]
pub use clock::ManualClock;
pub use scheduler::{LoopSettings, MonitorLoop, DEFAULT_POLL_CEILING_MS};
pub use windowing::{format_timestamp, AggregationWindow, Counters, ReportSnapshot, TIMESTAMP_FORMAT};
