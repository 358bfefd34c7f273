//! Fixed-capacity history of received reports.
//!
//! When full, the oldest report is overwritten. The whole history is saved
//! as JSON after every append so a restart picks up where it left off.

use crate::core::ReportSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Two reports a minute for a day.
pub const DEFAULT_HISTORY_CAPACITY: usize = 24 * 60 * 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportHistory {
    capacity: usize,
    reports: VecDeque<ReportSnapshot>,
}

impl ReportHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            reports: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
        }
    }

    /// Load a saved history, keeping at most the newest `capacity` reports.
    ///
    /// A missing file yields an empty history.
    pub fn load(path: &Path, capacity: usize) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::new(capacity));
        }

        let content = std::fs::read_to_string(path)?;
        let saved: ReportHistory =
            serde_json::from_str(&content).map_err(std::io::Error::other)?;

        let mut history = Self::new(capacity);
        for report in saved.reports {
            history.push(report);
        }
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Append a report, dropping the oldest when full.
    pub fn push(&mut self, report: ReportSnapshot) {
        if self.reports.len() == self.capacity {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
    }

    /// All reports, oldest first.
    pub fn to_vec(&self) -> Vec<ReportSnapshot> {
        self.reports.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
