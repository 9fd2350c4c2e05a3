//! Starting the daemon in the background and detaching it from the terminal.

use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::DaemonError;
use crate::paths::SETTLE_TIME;

/// Hidden subcommand the CLI re-executes itself with to become the daemon.
pub const DAEMON_ROLE: &str = "daemon";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    AlreadyRunning,
    Started,
}

/// Whether something accepts connections on `socket`.
///
/// A file nobody answers on is a leftover from an unclean exit.
pub fn is_running(socket: &Path) -> bool {
    socket.exists() && UnixStream::connect(socket).is_ok()
}

/// Spawn `exe daemon <sync_dir>` unless a daemon already answers on `socket`,
/// then give it [`SETTLE_TIME`] to bind.
pub fn start(exe: &Path, sync_dir: &Path, socket: &Path) -> Result<StartOutcome, DaemonError> {
    if is_running(socket) {
        return Ok(StartOutcome::AlreadyRunning);
    }
    if socket.exists() {
        tracing::warn!(socket = %socket.display(), "stale endpoint, daemon will reclaim it");
    }

    let mut child = Command::new(exe)
        .arg(DAEMON_ROLE)
        .arg(sync_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| DaemonError::Spawn {
            exe: exe.to_path_buf(),
            source,
        })?;
    tracing::info!(pid = child.id(), sync_dir = %sync_dir.display(), "daemon spawned");

    let deadline = Instant::now() + SETTLE_TIME;
    while Instant::now() < deadline {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(DaemonError::Exited(status.to_string()));
        }
        if is_running(socket) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(StartOutcome::Started)
}

/// Start a new session so the daemon outlives the terminal that started it.
pub fn detach() -> Result<(), DaemonError> {
    nix::unistd::setsid().map_err(DaemonError::Detach)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_endpoint_is_not_running() {
        let dir = TempDir::new().unwrap();
        assert!(!is_running(&dir.path().join("sim.socket")));
    }

    #[test]
    fn unanswered_endpoint_is_not_running() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("sim.socket");
        drop(std::os::unix::net::UnixListener::bind(&socket).unwrap());
        assert!(socket.exists());
        assert!(!is_running(&socket));
    }

    #[test]
    fn live_endpoint_means_already_running() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("sim.socket");
        let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

        let outcome = start(Path::new("/nonexistent/never-run"), dir.path(), &socket).unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyRunning);
    }

    #[test]
    fn unspawnable_exe_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = start(
            Path::new("/nonexistent/never-run"),
            dir.path(),
            &dir.path().join("sim.socket"),
        )
        .unwrap_err();
        assert!(matches!(err, DaemonError::Spawn { .. }), "got: {err}");
    }

    #[test]
    fn daemon_exiting_during_settle_is_reported() {
        let dir = TempDir::new().unwrap();
        // `false daemon <dir>` exits non-zero right away.
        let err = start(
            Path::new("false"),
            dir.path(),
            &dir.path().join("sim.socket"),
        )
        .unwrap_err();
        assert!(matches!(err, DaemonError::Exited(_)), "got: {err}");
    }
}
