//! Classification of raw input events into activity counts.
//!
//! Key presses count as keyboard activity; button transitions and
//! (debounced) pointer motion count as mouse activity. Classification is
//! pure apart from the debounce state and counters it is handed.

use crate::collector::types::{EventKind, RawInputEvent, SourceId};
use crate::core::windowing::Counters;
use std::collections::HashMap;

/// Upper bound (exclusive) of counted key codes on a standard layout.
pub const DEFAULT_KEYCODE_LIMIT: u16 = 71;

/// Minimum spacing between counted motion events from one source.
pub const DEFAULT_MOTION_DEBOUNCE_MS: u64 = 50;

/// Which counter an event contributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Keyboard,
    Mouse,
}

/// Last counted motion time per source.
///
/// Survives window boundaries: it tracks physical event density, not the
/// reporting cadence.
#[derive(Debug, Clone, Default)]
pub struct DebounceState {
    last_motion_ms: HashMap<SourceId, u64>,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_motion_ms(&self, source: SourceId) -> Option<u64> {
        self.last_motion_ms.get(&source).copied()
    }
}

/// Classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    keycode_limit: u16,
    motion_debounce_ms: u64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCODE_LIMIT, DEFAULT_MOTION_DEBOUNCE_MS)
    }
}

impl Classifier {
    pub fn new(keycode_limit: u16, motion_debounce_ms: u64) -> Self {
        Self {
            keycode_limit,
            motion_debounce_ms,
        }
    }

    /// Whether `code` is a counted key (`0 < code < limit`).
    pub fn is_valid_keycode(&self, code: u16) -> bool {
        code > 0 && code < self.keycode_limit
    }

    /// Classify one event, bumping at most one counter.
    ///
    /// Both the press and the release of a mouse button are counted, so a
    /// click registers as two mouse events. Existing reports depend on this.
    pub fn classify(
        &self,
        event: &RawInputEvent,
        debounce: &mut DebounceState,
        counters: &mut Counters,
    ) -> Option<Activity> {
        match event.kind {
            EventKind::KeyPress if self.is_valid_keycode(event.code) => {
                counters.increment_keyboard();
                Some(Activity::Keyboard)
            }
            EventKind::ButtonPress | EventKind::ButtonRelease => {
                counters.increment_mouse();
                Some(Activity::Mouse)
            }
            kind if kind.is_motion() => {
                // Event times follow the wall clock. After a backwards step
                // the first motion counts and restarts the debounce timer.
                let due = match debounce.last_motion_ms.get(&event.source) {
                    Some(&last) if event.timestamp_ms < last => true,
                    Some(&last) => event.timestamp_ms - last > self.motion_debounce_ms,
                    None => true,
                };
                if !due {
                    return None;
                }
                debounce
                    .last_motion_ms
                    .insert(event.source, event.timestamp_ms);
                counters.increment_mouse();
                Some(Activity::Mouse)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KBD: SourceId = SourceId(0);
    const PTR: SourceId = SourceId(1);

    fn event(source: SourceId, kind: EventKind, code: u16, at: u64) -> RawInputEvent {
        RawInputEvent::new(source, kind, code, at)
    }

    #[test]
    fn test_only_valid_key_presses_count() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        let events = [
            event(KBD, EventKind::KeyPress, 30, 0),
            event(KBD, EventKind::KeyRelease, 30, 1),
            event(KBD, EventKind::KeyPress, 0, 2),
            event(KBD, EventKind::KeyPress, 71, 3),
            event(KBD, EventKind::KeyPress, 300, 4),
            event(KBD, EventKind::KeyPress, 1, 5),
            event(KBD, EventKind::KeyPress, 70, 6),
            event(KBD, EventKind::Other, 30, 7),
        ];
        for e in &events {
            classifier.classify(e, &mut debounce, &mut counters);
        }

        assert_eq!(counters.keyboard_events(), 3);
        assert_eq!(counters.mouse_events(), 0);
    }

    #[test]
    fn test_custom_keycode_limit() {
        let classifier = Classifier::new(256, DEFAULT_MOTION_DEBOUNCE_MS);
        assert!(classifier.is_valid_keycode(200));
        assert!(!classifier.is_valid_keycode(256));
        assert!(!classifier.is_valid_keycode(0));
    }

    #[test]
    fn test_button_transitions_each_count() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        for i in 0..3 {
            classifier.classify(
                &event(PTR, EventKind::ButtonPress, 272, i * 10),
                &mut debounce,
                &mut counters,
            );
            classifier.classify(
                &event(PTR, EventKind::ButtonRelease, 272, i * 10 + 5),
                &mut debounce,
                &mut counters,
            );
        }

        assert_eq!(counters.mouse_events(), 6);
        assert_eq!(counters.keyboard_events(), 0);
    }

    #[test]
    fn test_motion_burst_counts_once() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        for at in 1_000..1_040 {
            classifier.classify(
                &event(PTR, EventKind::RelativeMotion, 0, at),
                &mut debounce,
                &mut counters,
            );
        }

        assert_eq!(counters.mouse_events(), 1);
        assert_eq!(debounce.last_motion_ms(PTR), Some(1_000));
    }

    #[test]
    fn test_spaced_motion_counts_each() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        classifier.classify(
            &event(PTR, EventKind::RelativeMotion, 0, 1_000),
            &mut debounce,
            &mut counters,
        );
        classifier.classify(
            &event(PTR, EventKind::AbsoluteMotion, 0, 1_051),
            &mut debounce,
            &mut counters,
        );

        assert_eq!(counters.mouse_events(), 2);
    }

    #[test]
    fn test_motion_at_exact_threshold_is_suppressed() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        for at in [1_000, 1_050] {
            classifier.classify(
                &event(PTR, EventKind::RelativeMotion, 0, at),
                &mut debounce,
                &mut counters,
            );
        }

        assert_eq!(counters.mouse_events(), 1);
    }

    #[test]
    fn test_debounce_is_per_source() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        classifier.classify(
            &event(SourceId(1), EventKind::RelativeMotion, 0, 1_000),
            &mut debounce,
            &mut counters,
        );
        classifier.classify(
            &event(SourceId(2), EventKind::RelativeMotion, 0, 1_010),
            &mut debounce,
            &mut counters,
        );

        assert_eq!(counters.mouse_events(), 2);
    }

    #[test]
    fn test_motion_after_clock_steps_back() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        classifier.classify(
            &event(PTR, EventKind::RelativeMotion, 0, 100_000),
            &mut debounce,
            &mut counters,
        );

        // Wall clock stepped back 60s; motion keeps counting at its usual rate.
        for at in (40_000..50_000).step_by(100) {
            classifier.classify(
                &event(PTR, EventKind::RelativeMotion, 0, at),
                &mut debounce,
                &mut counters,
            );
        }

        assert_eq!(counters.mouse_events(), 101);
        assert_eq!(debounce.last_motion_ms(PTR), Some(49_900));
    }

    #[test]
    fn test_burst_after_clock_steps_back_counts_once() {
        let classifier = Classifier::default();
        let mut debounce = DebounceState::new();
        let mut counters = Counters::default();

        for at in [100_000, 40_000, 40_020, 40_049] {
            classifier.classify(
                &event(PTR, EventKind::RelativeMotion, 0, at),
                &mut debounce,
                &mut counters,
            );
        }

        assert_eq!(counters.mouse_events(), 2);
    }
}
