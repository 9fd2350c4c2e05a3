//! Text rendering of the `status` reply.

use std::fmt;
use std::path::Path;

use simulator_core::types::{format_gb, format_mb};
use simulator_core::{DaemonState, QuotaInfo};

use crate::session::SyncSession;

/// A borrowed view of the engine state, rendered in the client's status format.
#[derive(Debug, Clone, Copy)]
pub struct StatusReport<'a> {
    pub state: DaemonState,
    pub sync_dir: &'a Path,
    pub session: &'a SyncSession,
    pub quota: Option<&'a QuotaInfo>,
}

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Progress is only meaningful mid-transfer with a known size.
        if self.state == DaemonState::Busy {
            if let Some(percent) = self.session.percent() {
                writeln!(
                    f,
                    "Sync progress: {} MB/ {} MB ({percent} %)",
                    format_mb(self.session.transferred_bytes()),
                    format_mb(self.session.total_bytes()),
                )?;
            }
        }

        writeln!(f, "Synchronization core status: {}", self.state)?;
        write!(
            f,
            "Path to Yandex.Disk directory: '{}'",
            self.sync_dir.display()
        )?;

        match self.quota {
            Some(quota) => {
                write!(f, "\n\tTotal: {} GB", format_gb(quota.total_bytes))?;
                write!(f, "\n\tUsed: {} GB", format_gb(quota.used_bytes))?;
                write!(f, "\n\tAvailable: {} GB", format_gb(quota.available_bytes()))?;
                write!(f, "\n\tMax file size: {} GB", quota.max_file_size_gb())?;
                write!(f, "\n\tTrash size: {} B", quota.trash_bytes)?;
            }
            None => write!(f, "\n\tThe quota has not been received yet.")?,
        }

        if self.session.has_recent_items() {
            write!(f, "\n\nLast synchronized items:")?;
            for item in self.session.recent_items() {
                write!(f, "\n\tfile: '{item}'")?;
            }
        }
        Ok(())
    }
}
