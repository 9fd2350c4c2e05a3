use std::path::PathBuf;

use simulator_core::ConfigError;
use thiserror::Error;

/// Error surface for the daemon runtime, the command channel, and lifecycle management.
///
/// Variants whose text reaches the user start with `Error:` the way the real
/// client words them.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error: daemon socket already in use: {}", socket.display())]
    AddressInUse { socket: PathBuf },

    #[error("Error: daemon not started")]
    NotStarted,

    #[error("Socket dial error: {source}")]
    Dial {
        socket: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket write error: {0}")]
    Write(#[source] std::io::Error),

    #[error("Socket read error: {0}")]
    Read(#[source] std::io::Error),

    /// An `Error:`-prefixed reply from the daemon, passed through verbatim.
    #[error("{0}")]
    Daemon(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("syscall setsid() error: {0}")]
    Detach(#[source] nix::Error),

    #[error("Error: daemon exited during start-up ({0})")]
    Exited(String),

    #[error("failed to spawn daemon process {}: {source}", exe.display())]
    Spawn {
        exe: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
