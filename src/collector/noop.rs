//! Non-Linux (noop) implementation of event collection.
//!
//! This exists so the crate (and binary) can compile on targets without
//! evdev. Nothing can be opened and discovery finds nothing.

use crate::collector::types::{RawInputEvent, SourceId};
use crate::collector::{CollectorError, DiscoveredDevice, EventSourceSet};
use std::path::PathBuf;
use std::time::Duration;

/// A source set that never holds any device.
pub struct DeviceSet {
    _private: (),
}

impl DeviceSet {
    /// Input devices are only supported on Linux.
    pub fn open_all(paths: &[PathBuf]) -> Result<Self, CollectorError> {
        match paths.first() {
            Some(path) => Err(CollectorError::DeviceUnavailable {
                path: path.clone(),
                reason: "input event devices are only supported on Linux".to_string(),
                permission_denied: false,
            }),
            None => Err(CollectorError::NoDevices),
        }
    }
}

impl EventSourceSet for DeviceSet {
    fn poll_ready(&mut self, timeout: Duration) -> Result<Vec<SourceId>, CollectorError> {
        std::thread::sleep(timeout);
        Ok(Vec::new())
    }

    fn drain(&mut self, _id: SourceId, _out: &mut Vec<RawInputEvent>) -> Result<usize, CollectorError> {
        Ok(0)
    }

    fn remove(&mut self, _id: SourceId) {}

    fn live_count(&self) -> usize {
        0
    }
}

pub fn discover_devices() -> Vec<DiscoveredDevice> {
    Vec::new()
}

pub fn default_device_paths() -> Vec<PathBuf> {
    Vec::new()
}
