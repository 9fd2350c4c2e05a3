//! Per-run transfer bookkeeping and the append-only session log.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{io_err, DaemonError};

/// How many synced items a status report lists.
pub const RECENT_ITEMS_LIMIT: usize = 10;

/// Transfer counters for the current run plus the recent-items history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSession {
    total_bytes: u64,
    transferred_bytes: u64,
    recent_items: VecDeque<String>,
}

impl SyncSession {
    /// Begin a new run. Counters reset; the recent-items history carries over.
    pub fn restart(&mut self, total_bytes: u64) {
        self.total_bytes = total_bytes;
        self.transferred_bytes = 0;
    }

    /// Add transferred bytes, never passing the total.
    pub fn advance(&mut self, bytes: u64) {
        self.transferred_bytes = self
            .transferred_bytes
            .saturating_add(bytes)
            .min(self.total_bytes);
    }

    /// Push an item to the front of the history, dropping the oldest past the limit.
    pub fn record_item(&mut self, name: impl Into<String>) {
        self.recent_items.push_front(name.into());
        self.recent_items.truncate(RECENT_ITEMS_LIMIT);
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// `round(100 * transferred / total)`, or `None` while the total is unknown.
    pub fn percent(&self) -> Option<u64> {
        if self.total_bytes == 0 {
            return None;
        }
        let ratio = self.transferred_bytes as f64 / self.total_bytes as f64;
        Some((ratio * 100.0).round() as u64)
    }

    /// Most recent first.
    pub fn recent_items(&self) -> impl Iterator<Item = &str> {
        self.recent_items.iter().map(String::as_str)
    }

    pub fn has_recent_items(&self) -> bool {
        !self.recent_items.is_empty()
    }
}

/// Timestamped, append-only record of every simulated event.
pub struct SessionLog {
    out: Box<dyn Write + Send + Sync>,
}

impl SessionLog {
    /// Open (creating parents) `path` for appending.
    pub fn open(path: &Path) -> Result<Self, DaemonError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(out: impl Write + Send + Sync + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// A log that discards everything.
    pub fn sink() -> Self {
        Self::from_writer(std::io::sink())
    }

    pub fn record(&mut self, line: &str) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        if let Err(err) = writeln!(self.out, "{stamp} {line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %err, "session log write failed");
        }
    }
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog").finish_non_exhaustive()
    }
}
