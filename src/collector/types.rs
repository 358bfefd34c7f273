//! Raw input event types produced by the event source adapters.
//!
//! These carry just enough to classify activity: what happened, a
//! source-defined code and when. They are consumed immediately by the
//! classifier and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a source in the source set. Stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub usize);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// What kind of device a source wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceRole {
    Keyboard,
    Pointer,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Keyboard => write!(f, "keyboard"),
            SourceRole::Pointer => write!(f, "pointer"),
        }
    }
}

/// Event classification as seen by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    ButtonPress,
    ButtonRelease,
    RelativeMotion,
    AbsoluteMotion,
    Other,
}

/// Button codes (`BTN_MISC` through `BTN_GEAR_UP`) share the key event
/// type with keyboard keys.
const BUTTON_CODES: std::ops::RangeInclusive<u16> = 0x100..=0x151;

impl EventKind {
    /// Map a key or button transition to a kind by its code.
    ///
    /// `1` is a press, `0` a release; anything else (autorepeat is `2`)
    /// is not a transition. Button codes map to button kinds on any
    /// device, so a combined keyboard and touchpad node still counts clicks.
    pub fn from_key(code: u16, value: i32) -> Self {
        let button = BUTTON_CODES.contains(&code);
        match (button, value) {
            (false, 1) => EventKind::KeyPress,
            (false, 0) => EventKind::KeyRelease,
            (true, 1) => EventKind::ButtonPress,
            (true, 0) => EventKind::ButtonRelease,
            _ => EventKind::Other,
        }
    }

    pub fn is_motion(self) -> bool {
        matches!(self, EventKind::RelativeMotion | EventKind::AbsoluteMotion)
    }
}

/// A single discrete event read from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    pub source: SourceId,
    pub kind: EventKind,
    pub code: u16,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl RawInputEvent {
    pub fn new(source: SourceId, kind: EventKind, code: u16, timestamp_ms: u64) -> Self {
        Self {
            source,
            kind,
            code,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_mapping() {
        // KEY_A
        assert_eq!(EventKind::from_key(30, 1), EventKind::KeyPress);
        assert_eq!(EventKind::from_key(30, 0), EventKind::KeyRelease);
        assert_eq!(EventKind::from_key(30, 2), EventKind::Other);
        // BTN_LEFT, BTN_RIGHT
        assert_eq!(EventKind::from_key(272, 1), EventKind::ButtonPress);
        assert_eq!(EventKind::from_key(273, 0), EventKind::ButtonRelease);
        assert_eq!(EventKind::from_key(272, 2), EventKind::Other);
    }

    #[test]
    fn test_button_range_edges() {
        // BTN_MISC and BTN_GEAR_UP are buttons; KEY_OK is a key.
        assert_eq!(EventKind::from_key(0x100, 1), EventKind::ButtonPress);
        assert_eq!(EventKind::from_key(0x151, 1), EventKind::ButtonPress);
        assert_eq!(EventKind::from_key(0x160, 1), EventKind::KeyPress);
        assert_eq!(EventKind::from_key(0xff, 1), EventKind::KeyPress);
    }

    #[test]
    fn test_motion_kinds() {
        assert!(EventKind::RelativeMotion.is_motion());
        assert!(EventKind::AbsoluteMotion.is_motion());
        assert!(!EventKind::ButtonPress.is_motion());
    }
}
