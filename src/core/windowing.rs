//! Fixed-interval aggregation windows.
//!
//! Activity is counted into a single window that is snapshotted and reset
//! each time the report interval elapses. The boundary moves before any
//! reporting I/O happens, so a slow report never delays or repeats the
//! next window.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format shared by the local sink and the remote payload.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Activity counts for the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    keyboard_events: u64,
    mouse_events: u64,
}

impl Counters {
    pub fn increment_keyboard(&mut self) {
        self.keyboard_events = self.keyboard_events.saturating_add(1);
    }

    pub fn increment_mouse(&mut self) {
        self.mouse_events = self.mouse_events.saturating_add(1);
    }

    pub fn keyboard_events(&self) -> u64 {
        self.keyboard_events
    }

    pub fn mouse_events(&self) -> u64 {
        self.mouse_events
    }

    pub fn is_empty(&self) -> bool {
        self.keyboard_events == 0 && self.mouse_events == 0
    }
}

/// Counts for one completed window, ready to be reported.
///
/// Serializes to the wire payload: `{"date", "keyboard_events", "mouse_events"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// Local time of the boundary, `YYYY-MM-DD HH:MM:SS`
    pub date: String,
    pub keyboard_events: u64,
    pub mouse_events: u64,
}

impl ReportSnapshot {
    /// The line appended to the local sink (without the newline).
    pub fn sink_line(&self, include_mouse: bool) -> String {
        if include_mouse {
            format!("{} {} {}", self.date, self.keyboard_events, self.mouse_events)
        } else {
            format!("{} {}", self.date, self.keyboard_events)
        }
    }
}

/// The window that is currently being filled.
#[derive(Debug, Clone)]
pub struct AggregationWindow {
    counters: Counters,
    last_report_ms: u64,
    report_interval_ms: u64,
}

impl AggregationWindow {
    /// Start a window at `start_ms`. A zero interval is raised to 1 ms.
    pub fn new(start_ms: u64, report_interval_ms: u64) -> Self {
        Self {
            counters: Counters::default(),
            last_report_ms: start_ms,
            report_interval_ms: report_interval_ms.max(1),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub fn report_interval_ms(&self) -> u64 {
        self.report_interval_ms
    }

    pub fn last_report_ms(&self) -> u64 {
        self.last_report_ms
    }

    /// Whether the report interval has fully elapsed at `now_ms`.
    ///
    /// A `now_ms` before the last boundary means the clock was stepped
    /// back; the window is due so the next snapshot rebases the boundary.
    pub fn should_flush(&self, now_ms: u64) -> bool {
        match now_ms.checked_sub(self.last_report_ms) {
            Some(elapsed) => elapsed >= self.report_interval_ms,
            None => true,
        }
    }

    /// Milliseconds left until the next boundary (zero once it is due).
    pub fn time_until_boundary(&self, now_ms: u64) -> u64 {
        match now_ms.checked_sub(self.last_report_ms) {
            Some(elapsed) => self.report_interval_ms.saturating_sub(elapsed),
            None => 0,
        }
    }

    /// Take the current counts, reset them and start the next window at `now_ms`.
    ///
    /// The snapshot is dated from `wall_ms` (epoch milliseconds), which may
    /// come from a different clock than `now_ms`.
    pub fn snapshot_and_reset(&mut self, now_ms: u64, wall_ms: u64) -> ReportSnapshot {
        let counters = std::mem::take(&mut self.counters);
        self.last_report_ms = now_ms;

        ReportSnapshot {
            date: format_timestamp(wall_ms),
            keyboard_events: counters.keyboard_events,
            mouse_events: counters.mouse_events,
        }
    }
}

/// Format epoch milliseconds as local time with second precision.
pub fn format_timestamp(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
