//! Domain types shared by the daemon and the command-line front end.

use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Phase of the simulated synchronization core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaemonState {
    #[default]
    Idle,
    Index,
    Busy,
    Error,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Idle => write!(f, "idle"),
            DaemonState::Index => write!(f, "index"),
            DaemonState::Busy => write!(f, "busy"),
            DaemonState::Error => write!(f, "error"),
        }
    }
}

/// What started a scripted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Daemon start-up: initial indexing and the first transfer.
    Start,
    /// An explicit `sync` command.
    Sync,
    /// An explicit `error` command: short excursion into [`DaemonState::Error`].
    Error,
}

impl TriggerEvent {
    /// Whether this event begins a new synchronization session.
    pub fn starts_session(self) -> bool {
        matches!(self, TriggerEvent::Start | TriggerEvent::Sync)
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Start => write!(f, "Start"),
            TriggerEvent::Sync => write!(f, "Synchronization"),
            TriggerEvent::Error => write!(f, "Error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

const GIB: u64 = 1024 * 1024 * 1024;

/// Disk quota reported once the simulated client has "received" it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub max_file_size_bytes: u64,
    pub trash_bytes: u64,
}

impl QuotaInfo {
    /// The fixed quota every simulated account reports.
    pub const SCRIPTED: QuotaInfo = QuotaInfo {
        total_bytes: 46_707_769_344,
        used_bytes: 3_103_113_871,
        max_file_size_bytes: 50 * GIB,
        trash_bytes: 0,
    };

    pub fn available_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }

    /// Whole gigabytes; the client prints this limit without decimals.
    pub fn max_file_size_gb(&self) -> u64 {
        self.max_file_size_bytes / GIB
    }
}

/// Formats a byte count as gigabytes with two decimals (`43.50`).
pub fn format_gb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / GIB as f64)
}

/// Formats a byte count as megabytes with two decimals (`139.38`).
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_is_lowercase() {
        assert_eq!(DaemonState::Idle.to_string(), "idle");
        assert_eq!(DaemonState::Index.to_string(), "index");
        assert_eq!(DaemonState::Busy.to_string(), "busy");
        assert_eq!(DaemonState::Error.to_string(), "error");
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(DaemonState::default(), DaemonState::Idle);
    }

    #[test]
    fn only_start_and_sync_open_a_session() {
        assert!(TriggerEvent::Start.starts_session());
        assert!(TriggerEvent::Sync.starts_session());
        assert!(!TriggerEvent::Error.starts_session());
    }

    #[test]
    fn scripted_quota_renders_expected_figures() {
        let quota = QuotaInfo::SCRIPTED;
        assert_eq!(format_gb(quota.total_bytes), "43.50");
        assert_eq!(format_gb(quota.used_bytes), "2.89");
        assert_eq!(format_gb(quota.available_bytes()), "40.61");
        assert_eq!(quota.max_file_size_bytes / GIB, 50);
    }

    #[test]
    fn megabytes_use_two_decimals() {
        assert_eq!(format_mb(0), "0.00");
        assert_eq!(format_mb(146_150_523), "139.38");
        assert_eq!(format_mb(68_513_956), "65.34");
    }
}
