//! Linux implementation of event collection using evdev character devices.
//!
//! Each configured `/dev/input/event*` node is opened non-blocking and
//! multiplexed with `poll(2)`. Reading requires access to the device node,
//! which usually means root or membership of the `input` group.

use crate::collector::types::{EventKind, RawInputEvent, SourceId, SourceRole};
use crate::collector::{CollectorError, DiscoveredDevice, EventSourceSet};
use evdev::{Device, EventType, InputEvent, Key, RelativeAxisType};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// One open input device.
pub struct DeviceSource {
    path: PathBuf,
    role: SourceRole,
    device: Device,
}

impl DeviceSource {
    /// Open a device node in non-blocking mode and detect its role.
    pub fn open(path: &Path) -> Result<Self, CollectorError> {
        let device = Device::open(path).map_err(|e| CollectorError::unavailable(path, &e))?;
        set_nonblocking(device.as_raw_fd()).map_err(|e| CollectorError::unavailable(path, &e))?;

        let role = detect_role(&device).unwrap_or_else(|| {
            tracing::debug!(
                path = %path.display(),
                "device has no keyboard or pointer capabilities, treating as keyboard"
            );
            SourceRole::Keyboard
        });

        Ok(Self {
            path: path.to_path_buf(),
            role,
            device,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> SourceRole {
        self.role
    }

    pub fn name(&self) -> &str {
        self.device.name().unwrap_or("unknown")
    }

    /// Read whatever the kernel has buffered for this device.
    fn read_batch(
        &mut self,
        id: SourceId,
        out: &mut Vec<RawInputEvent>,
    ) -> Result<usize, CollectorError> {
        match self.device.fetch_events() {
            Ok(events) => {
                let before = out.len();
                out.extend(events.map(|ev| to_raw_event(id, &ev)));
                Ok(out.len() - before)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(CollectorError::DeviceRead {
                source: id,
                reason: e.to_string(),
            }),
        }
    }
}

/// The set of open devices, indexed by [`SourceId`].
pub struct DeviceSet {
    slots: Vec<Option<DeviceSource>>,
}

impl DeviceSet {
    /// Open every path in order. Any failure is fatal.
    pub fn open_all(paths: &[PathBuf]) -> Result<Self, CollectorError> {
        if paths.is_empty() {
            return Err(CollectorError::NoDevices);
        }

        let mut slots = Vec::with_capacity(paths.len());
        for path in paths {
            let source = DeviceSource::open(path)?;
            tracing::info!(
                id = %SourceId(slots.len()),
                path = %path.display(),
                name = source.name(),
                role = %source.role(),
                "opened input device"
            );
            slots.push(Some(source));
        }

        Ok(Self { slots })
    }

    /// Iterate over the sources that are still live.
    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &DeviceSource)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (SourceId(i), s)))
    }
}

impl EventSourceSet for DeviceSet {
    fn poll_ready(&mut self, timeout: Duration) -> Result<Vec<SourceId>, CollectorError> {
        let mut fds = Vec::with_capacity(self.slots.len());
        let mut ids = Vec::with_capacity(self.slots.len());
        for (id, source) in self.sources() {
            fds.push(libc::pollfd {
                fd: source.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            });
            ids.push(id);
        }

        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(CollectorError::Poll(err.to_string()));
        }

        // Error and hangup conditions count as ready so the following read
        // surfaces the failure and the source gets dropped.
        let mask = libc::POLLIN | libc::POLLERR | libc::POLLHUP | libc::POLLNVAL;
        Ok(fds
            .iter()
            .zip(ids)
            .filter(|(fd, _)| fd.revents & mask != 0)
            .map(|(_, id)| id)
            .collect())
    }

    fn drain(&mut self, id: SourceId, out: &mut Vec<RawInputEvent>) -> Result<usize, CollectorError> {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(source) => source.read_batch(id, out),
            None => Ok(0),
        }
    }

    fn remove(&mut self, id: SourceId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if let Some(source) = slot.take() {
                tracing::info!(id = %id, path = %source.path.display(), "closed input device");
            }
        }
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Convert an evdev record into a raw event.
fn to_raw_event(id: SourceId, ev: &InputEvent) -> RawInputEvent {
    let kind = match ev.event_type() {
        EventType::KEY => EventKind::from_key(ev.code(), ev.value()),
        EventType::RELATIVE => EventKind::RelativeMotion,
        EventType::ABSOLUTE => EventKind::AbsoluteMotion,
        _ => EventKind::Other,
    };

    let timestamp_ms = ev
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    RawInputEvent::new(id, kind, ev.code(), timestamp_ms)
}

/// Guess whether a device is a keyboard or a pointer from its capabilities.
fn detect_role(device: &Device) -> Option<SourceRole> {
    let keys = device.supported_keys();

    if keys.map_or(false, |k| k.contains(Key::KEY_A) && k.contains(Key::KEY_ENTER)) {
        return Some(SourceRole::Keyboard);
    }

    let has_rel = device
        .supported_relative_axes()
        .map_or(false, |axes| axes.contains(RelativeAxisType::REL_X));
    let has_button = keys.map_or(false, |k| k.contains(Key::BTN_LEFT));
    if has_rel || has_button {
        return Some(SourceRole::Pointer);
    }

    None
}

fn set_nonblocking(fd: RawFd) -> std::io::Result<()> {
    // Preserve existing flags; just OR in O_NONBLOCK.
    let current = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if current < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, current | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// List every readable input device that looks like a keyboard or pointer.
pub fn discover_devices() -> Vec<DiscoveredDevice> {
    let mut found: Vec<DiscoveredDevice> = evdev::enumerate()
        .filter_map(|(path, device)| {
            detect_role(&device).map(|role| DiscoveredDevice {
                name: device.name().unwrap_or("unknown").to_string(),
                path,
                role,
            })
        })
        .collect();
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// The first keyboard followed by the first pointer, when present.
pub fn default_device_paths() -> Vec<PathBuf> {
    let devices = discover_devices();
    [SourceRole::Keyboard, SourceRole::Pointer]
        .iter()
        .filter_map(|role| devices.iter().find(|d| d.role == *role))
        .map(|d| d.path.clone())
        .collect()
}
