//! Cumulative activity and delivery statistics.
//!
//! Windows reset, these don't. With persistence enabled the totals carry
//! over between runs, so the CLI can show everything counted on this
//! machine and how reporting went.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running totals, seeded from earlier runs when persisted.
#[derive(Debug)]
pub struct ActivityStats {
    keyboard_events: AtomicU64,
    mouse_events: AtomicU64,
    windows_reported: AtomicU64,
    deliveries_succeeded: AtomicU64,
    deliveries_failed: AtomicU64,
    sink_failures: AtomicU64,
    sources_dropped: AtomicU64,
    started_at: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityStats {
    pub fn new() -> Self {
        Self {
            keyboard_events: AtomicU64::new(0),
            mouse_events: AtomicU64::new(0),
            windows_reported: AtomicU64::new(0),
            deliveries_succeeded: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            sources_dropped: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that are saved to (and seeded from) `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::debug!(error = %e, "could not load previous stats");
        }

        stats
    }

    pub fn record_keyboard_event(&self) {
        self.keyboard_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mouse_event(&self) {
        self.mouse_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_reported(&self) {
        self.windows_reported.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, succeeded: bool) {
        if succeeded {
            self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_dropped(&self) {
        self.sources_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            keyboard_events: self.keyboard_events.load(Ordering::Relaxed),
            mouse_events: self.mouse_events.load(Ordering::Relaxed),
            windows_reported: self.windows_reported.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            sources_dropped: self.sources_dropped.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the end of a run.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Statistics (all runs):\n\
             - Keyboard events counted: {}\n\
             - Mouse events counted: {}\n\
             - Windows reported: {}\n\
             - Deliveries succeeded: {}\n\
             - Deliveries failed: {}\n\
             - Local log write failures: {}\n\
             - Devices dropped: {}\n\
             - This run: {} seconds",
            s.keyboard_events,
            s.mouse_events,
            s.windows_reported,
            s.deliveries_succeeded,
            s.deliveries_failed,
            s.sink_failures,
            s.sources_dropped,
            s.uptime_secs
        )
    }

    /// Save totals to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let s = self.snapshot();
            let persisted = PersistedStats {
                keyboard_events: s.keyboard_events,
                mouse_events: s.mouse_events,
                windows_reported: s.windows_reported,
                deliveries_succeeded: s.deliveries_succeeded,
                deliveries_failed: s.deliveries_failed,
                sink_failures: s.sink_failures,
                sources_dropped: s.sources_dropped,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.keyboard_events
                    .store(persisted.keyboard_events, Ordering::Relaxed);
                self.mouse_events
                    .store(persisted.mouse_events, Ordering::Relaxed);
                self.windows_reported
                    .store(persisted.windows_reported, Ordering::Relaxed);
                self.deliveries_succeeded
                    .store(persisted.deliveries_succeeded, Ordering::Relaxed);
                self.deliveries_failed
                    .store(persisted.deliveries_failed, Ordering::Relaxed);
                self.sink_failures
                    .store(persisted.sink_failures, Ordering::Relaxed);
                self.sources_dropped
                    .store(persisted.sources_dropped, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for ActivityStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub keyboard_events: u64,
    pub mouse_events: u64,
    pub windows_reported: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
    pub sink_failures: u64,
    pub sources_dropped: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    keyboard_events: u64,
    mouse_events: u64,
    windows_reported: u64,
    deliveries_succeeded: u64,
    deliveries_failed: u64,
    #[serde(default)]
    sink_failures: u64,
    #[serde(default)]
    sources_dropped: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<ActivityStats>;
