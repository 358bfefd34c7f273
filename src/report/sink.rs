//! Append-only local activity log.

use crate::core::windowing::ReportSnapshot;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Writes one line per report and flushes after every write.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    writer: W,
    include_mouse: bool,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W, include_mouse: bool) -> Self {
        Self {
            writer,
            include_mouse,
        }
    }

    /// Append `snapshot` as a single line.
    pub fn append(&mut self, snapshot: &ReportSnapshot) -> std::io::Result<()> {
        let mut line = snapshot.sink_line(self.include_mouse);
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineSink<File> {
    /// Open (or create) `path` in append mode, creating parent directories.
    pub fn open(path: &Path, include_mouse: bool) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file, include_mouse))
    }
}
