use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DAEMON_SOCKET: &str = "yandexdisksimulator.socket";
pub const DAEMON_LOG: &str = "yandexdisksimulator.log";

pub const SESSION_LOG_DIR: &str = ".sync";
pub const SESSION_LOG: &str = "cli.log";

/// Longest command token the daemon reads from a connection.
pub const COMMAND_BUF_LEN: usize = 8;
/// Longest reply the client reads from the daemon.
pub const REPLY_BUF_LEN: usize = 512;

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(1);
pub const SETTLE_TIME: Duration = Duration::from_secs(1);

pub fn socket_path_in(tmp: &Path) -> PathBuf {
    tmp.join(DAEMON_SOCKET)
}

/// `<temp dir>/yandexdisksimulator.socket`, shared by every client and daemon.
pub fn socket_path() -> PathBuf {
    socket_path_in(&std::env::temp_dir())
}

pub fn daemon_log_path_in(tmp: &Path) -> PathBuf {
    tmp.join(DAEMON_LOG)
}

/// Process-wide diagnostics log.
pub fn daemon_log_path() -> PathBuf {
    daemon_log_path_in(&std::env::temp_dir())
}

/// `<sync dir>/.sync/cli.log`, the append-only record of simulated events.
pub fn session_log_path(sync_dir: &Path) -> PathBuf {
    sync_dir.join(SESSION_LOG_DIR).join(SESSION_LOG)
}
