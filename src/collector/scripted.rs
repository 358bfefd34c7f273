//! An in-memory source set driven by a simulated clock.
//!
//! Events are queued per source with the time they "arrive". Waiting for
//! readiness advances the shared [`ManualClock`] to the next arrival (or to
//! the end of the timeout), so the poll loop can be exercised end to end
//! without devices or real time passing.

use crate::collector::types::{EventKind, RawInputEvent, SourceId};
use crate::collector::{CollectorError, EventSourceSet};
use crate::core::clock::{Clock, ManualClock};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Event { kind: EventKind, code: u16 },
    Fail(String),
}

#[derive(Debug, Clone)]
struct Pending {
    at_ms: u64,
    step: Step,
}

/// Scripted event sources sharing one simulated timeline.
pub struct ScriptedSources {
    clock: ManualClock,
    slots: Vec<Option<VecDeque<Pending>>>,
    batch_size: usize,
    polls: usize,
}

impl ScriptedSources {
    /// Create `sources` empty sources (ids `0..sources`).
    pub fn new(clock: ManualClock, sources: usize) -> Self {
        Self {
            clock,
            slots: (0..sources).map(|_| Some(VecDeque::new())).collect(),
            batch_size: 64,
            polls: 0,
        }
    }

    /// Limit how many events a single `drain` call hands out.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Queue an event on `id` arriving at `at_ms`.
    pub fn push(&mut self, id: SourceId, at_ms: u64, kind: EventKind, code: u16) {
        self.insert(id, at_ms, Step::Event { kind, code });
    }

    /// Make `id` fail with a read error at `at_ms`.
    pub fn push_failure(&mut self, id: SourceId, at_ms: u64, reason: impl Into<String>) {
        self.insert(id, at_ms, Step::Fail(reason.into()));
    }

    /// Whether `id` is still being multiplexed.
    pub fn is_live(&self, id: SourceId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Events not yet handed out on live sources.
    pub fn pending(&self) -> usize {
        self.slots.iter().flatten().map(VecDeque::len).sum()
    }

    /// Number of `poll_ready` calls so far.
    pub fn poll_count(&self) -> usize {
        self.polls
    }

    fn insert(&mut self, id: SourceId, at_ms: u64, step: Step) {
        if let Some(Some(queue)) = self.slots.get_mut(id.0) {
            // Keep arrival order; equal times stay in push order.
            let pos = queue.partition_point(|p| p.at_ms <= at_ms);
            queue.insert(pos, Pending { at_ms, step });
        }
    }

    fn next_arrival(&self) -> Option<u64> {
        self.slots
            .iter()
            .flatten()
            .filter_map(|q| q.front().map(|p| p.at_ms))
            .min()
    }
}

impl EventSourceSet for ScriptedSources {
    fn poll_ready(&mut self, timeout: Duration) -> Result<Vec<SourceId>, CollectorError> {
        self.polls += 1;
        let deadline = self
            .clock
            .now_ms()
            .saturating_add(timeout.as_millis() as u64);

        match self.next_arrival() {
            Some(at) if at <= deadline => self.clock.set(at),
            _ => {
                self.clock.set(deadline);
                return Ok(Vec::new());
            }
        }

        let now = self.clock.now_ms();
        Ok(self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let due = slot.as_ref()?.front()?.at_ms <= now;
                due.then_some(SourceId(i))
            })
            .collect())
    }

    fn drain(&mut self, id: SourceId, out: &mut Vec<RawInputEvent>) -> Result<usize, CollectorError> {
        let now = self.clock.now_ms();
        let Some(Some(queue)) = self.slots.get_mut(id.0) else {
            return Ok(0);
        };

        let mut count = 0;
        while count < self.batch_size {
            let Some(front) = queue.front() else { break };
            if front.at_ms > now {
                break;
            }
            match &front.step {
                // Hand out what was read before the failure first.
                Step::Fail(_) if count > 0 => break,
                Step::Fail(reason) => {
                    let reason = reason.clone();
                    queue.pop_front();
                    return Err(CollectorError::DeviceRead { source: id, reason });
                }
                Step::Event { kind, code } => {
                    out.push(RawInputEvent::new(id, *kind, *code, front.at_ms));
                    queue.pop_front();
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn remove(&mut self, id: SourceId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = None;
        }
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_advances_to_next_arrival() {
        let clock = ManualClock::new(0);
        let mut sources = ScriptedSources::new(clock.clone(), 2);
        sources.push(SourceId(1), 40, EventKind::ButtonPress, 272);

        let ready = sources.poll_ready(Duration::from_millis(100)).unwrap();
        assert_eq!(ready, vec![SourceId(1)]);
        assert_eq!(clock.now_ms(), 40);
    }

    #[test]
    fn test_poll_times_out_without_arrivals() {
        let clock = ManualClock::new(0);
        let mut sources = ScriptedSources::new(clock.clone(), 1);
        sources.push(SourceId(0), 500, EventKind::KeyPress, 30);

        let ready = sources.poll_ready(Duration::from_millis(200)).unwrap();
        assert!(ready.is_empty());
        assert_eq!(clock.now_ms(), 200);
    }

    #[test]
    fn test_drain_respects_batch_size() {
        let clock = ManualClock::new(0);
        let mut sources = ScriptedSources::new(clock, 1).with_batch_size(2);
        for _ in 0..3 {
            sources.push(SourceId(0), 0, EventKind::KeyPress, 30);
        }

        let mut out = Vec::new();
        assert_eq!(sources.drain(SourceId(0), &mut out).unwrap(), 2);
        assert_eq!(sources.drain(SourceId(0), &mut out).unwrap(), 1);
        assert_eq!(sources.drain(SourceId(0), &mut out).unwrap(), 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_failure_after_buffered_events() {
        let clock = ManualClock::new(0);
        let mut sources = ScriptedSources::new(clock, 1);
        sources.push(SourceId(0), 0, EventKind::KeyPress, 30);
        sources.push_failure(SourceId(0), 0, "unplugged");

        let mut out = Vec::new();
        assert_eq!(sources.drain(SourceId(0), &mut out).unwrap(), 1);
        assert!(sources.drain(SourceId(0), &mut out).is_err());

        sources.remove(SourceId(0));
        assert!(!sources.is_live(SourceId(0)));
        assert_eq!(sources.live_count(), 0);
    }
}
