//! Event collection for keymon.
//!
//! A source set multiplexes any number of input device streams and turns
//! their raw records into [`RawInputEvent`]s. The Linux implementation reads
//! evdev character devices; other targets get a stub that refuses to open
//! anything.

#[doc(hidden)]
pub mod scripted;
pub mod types;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(not(target_os = "linux"))]
pub mod noop;

use std::path::{Path, PathBuf};
use std::time::Duration;

// Re-export commonly used types
#[doc(hidden)]
pub use scripted::ScriptedSources;
pub use types::{EventKind, RawInputEvent, SourceId, SourceRole};

#[cfg(target_os = "linux")]
pub use linux::{default_device_paths, discover_devices, DeviceSet, DeviceSource};

#[cfg(not(target_os = "linux"))]
pub use noop::{default_device_paths, discover_devices, DeviceSet};

/// A set of event sources that can be waited on together.
///
/// Slots are index-stable: removing a source never shifts the ids of the
/// others, so a ready list returned by [`poll_ready`](Self::poll_ready) stays
/// valid while it is being drained.
pub trait EventSourceSet {
    /// Block until at least one live source is readable or `timeout` elapses.
    fn poll_ready(&mut self, timeout: Duration) -> Result<Vec<SourceId>, CollectorError>;

    /// Append one batch of buffered events from `id` to `out`.
    ///
    /// Returns the number of events appended; `0` means the source would
    /// block (or is no longer live).
    fn drain(&mut self, id: SourceId, out: &mut Vec<RawInputEvent>) -> Result<usize, CollectorError>;

    /// Exclude a source from future multiplexing.
    fn remove(&mut self, id: SourceId);

    /// Number of sources still being multiplexed.
    fn live_count(&self) -> usize;
}

/// A device found during discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub path: PathBuf,
    pub name: String,
    pub role: SourceRole,
}

/// Errors that can occur during event collection.
#[derive(Debug)]
pub enum CollectorError {
    /// A configured device could not be opened at startup.
    DeviceUnavailable {
        path: PathBuf,
        reason: String,
        permission_denied: bool,
    },
    /// A live device failed while being read.
    DeviceRead { source: SourceId, reason: String },
    /// Waiting for readiness failed.
    Poll(String),
    /// No device paths were configured and none could be discovered.
    NoDevices,
}

impl CollectorError {
    pub fn unavailable(path: &Path, err: &std::io::Error) -> Self {
        CollectorError::DeviceUnavailable {
            path: path.to_path_buf(),
            reason: err.to_string(),
            permission_denied: err.kind() == std::io::ErrorKind::PermissionDenied,
        }
    }
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::DeviceUnavailable {
                path,
                reason,
                permission_denied,
            } => {
                write!(f, "Cannot open input device {}: {reason}", path.display())?;
                if *permission_denied {
                    write!(
                        f,
                        " (run as root or add your user to the 'input' group)"
                    )?;
                }
                Ok(())
            }
            CollectorError::DeviceRead { source, reason } => {
                write!(f, "Read from {source} failed: {reason}")
            }
            CollectorError::Poll(reason) => write!(f, "Waiting for input failed: {reason}"),
            CollectorError::NoDevices => write!(
                f,
                "No input devices configured and none discovered under /dev/input"
            ),
        }
    }
}

impl std::error::Error for CollectorError {}
