//! The poll loop that drives collection and reporting.
//!
//! Each iteration waits on every live source for at most the time left in
//! the current window (capped by the poll ceiling), drains and classifies
//! whatever became readable, and reports the window once its interval has
//! elapsed. The loop holds no business state of its own beyond timing.

use crate::collector::{EventSourceSet, RawInputEvent, SourceId};
use crate::core::classifier::{Activity, Classifier, DebounceState};
use crate::core::clock::Clock;
use crate::core::windowing::{AggregationWindow, ReportSnapshot};
use crate::report::{ReportError, SnapshotReporter};
use crate::stats::{ActivityStats, SharedStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a single wait.
pub const DEFAULT_POLL_CEILING_MS: u64 = 200;

/// Timing and classification settings for the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub report_interval_ms: u64,
    pub poll_ceiling_ms: u64,
    pub keycode_limit: u16,
    pub motion_debounce_ms: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            report_interval_ms: 30_000,
            poll_ceiling_ms: DEFAULT_POLL_CEILING_MS,
            keycode_limit: crate::core::classifier::DEFAULT_KEYCODE_LIMIT,
            motion_debounce_ms: crate::core::classifier::DEFAULT_MOTION_DEBOUNCE_MS,
        }
    }
}

/// The monitor's single-threaded event loop.
pub struct MonitorLoop<S, C, R> {
    sources: S,
    clock: C,
    reporter: R,
    classifier: Classifier,
    debounce: DebounceState,
    window: AggregationWindow,
    poll_ceiling_ms: u64,
    stats: SharedStats,
    batch: Vec<RawInputEvent>,
}

impl<S, C, R> MonitorLoop<S, C, R>
where
    S: EventSourceSet,
    C: Clock,
    R: SnapshotReporter,
{
    /// Create a loop whose first window starts now.
    pub fn new(sources: S, clock: C, reporter: R, settings: &LoopSettings) -> Self {
        let window = AggregationWindow::new(clock.now_ms(), settings.report_interval_ms);
        Self {
            sources,
            clock,
            reporter,
            classifier: Classifier::new(settings.keycode_limit, settings.motion_debounce_ms),
            debounce: DebounceState::new(),
            window,
            poll_ceiling_ms: settings.poll_ceiling_ms.max(1),
            stats: Arc::new(ActivityStats::new()),
            batch: Vec::with_capacity(64),
        }
    }

    /// Share process-lifetime statistics with the caller.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn window(&self) -> &AggregationWindow {
        &self.window
    }

    pub fn sources(&self) -> &S {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut S {
        &mut self.sources
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// How long the next wait may block at `now_ms`.
    pub fn next_wait_ms(&self, now_ms: u64) -> u64 {
        self.window
            .time_until_boundary(now_ms)
            .min(self.poll_ceiling_ms)
    }

    /// Run until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        tracing::info!(
            sources = self.sources.live_count(),
            report_interval_ms = self.window.report_interval_ms(),
            poll_ceiling_ms = self.poll_ceiling_ms,
            "monitor loop started"
        );

        while running.load(Ordering::SeqCst) {
            self.tick();
        }

        tracing::info!("monitor loop stopped");
    }

    /// One wait/drain/flush iteration. Returns the snapshot if a window was reported.
    pub fn tick(&mut self) -> Option<ReportSnapshot> {
        let wait = Duration::from_millis(self.next_wait_ms(self.clock.now_ms()));

        let ready = match self.sources.poll_ready(wait) {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!(error = %e, "waiting for input failed");
                // Still honour the wait so a persistent failure can't spin.
                std::thread::sleep(wait);
                Vec::new()
            }
        };

        for id in ready {
            self.drain_source(id);
        }

        let now = self.clock.now_ms();
        if !self.window.should_flush(now) {
            return None;
        }

        let snapshot = self.window.snapshot_and_reset(now, self.clock.wall_ms());
        self.stats.record_window_reported();
        tracing::info!(
            date = %snapshot.date,
            keyboard_events = snapshot.keyboard_events,
            mouse_events = snapshot.mouse_events,
            "window complete"
        );

        match self.reporter.report(&snapshot) {
            Ok(()) => self.stats.record_delivery(true),
            Err(e) => self.record_report_error(&e),
        }

        Some(snapshot)
    }

    /// Read `id` until it would block, classifying as we go.
    fn drain_source(&mut self, id: SourceId) {
        loop {
            self.batch.clear();
            match self.sources.drain(id, &mut self.batch) {
                Ok(0) => break,
                Ok(_) => {
                    for event in &self.batch {
                        let activity = self.classifier.classify(
                            event,
                            &mut self.debounce,
                            self.window.counters_mut(),
                        );
                        match activity {
                            Some(Activity::Keyboard) => self.stats.record_keyboard_event(),
                            Some(Activity::Mouse) => self.stats.record_mouse_event(),
                            None => {}
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "dropping input source");
                    self.sources.remove(id);
                    self.stats.record_source_dropped();
                    if self.sources.live_count() == 0 {
                        tracing::warn!("no input sources left; reporting empty windows");
                    }
                    break;
                }
            }
        }
    }

    fn record_report_error(&self, err: &ReportError) {
        if err.sink_failed() {
            self.stats.record_sink_failure();
        }
        self.stats.record_delivery(!err.transport_failed());
    }
}
