//! Error types for simulator-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing or reading the simulator configuration.
///
/// The `Display` text of the user-facing variants is printed verbatim by the
/// CLI, so it mirrors the wording of the real client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file is absent, has no `dir` option, or `dir` does not exist.
    #[error("Error: option 'dir' is missing")]
    DirMissing,

    /// The config file has no `auth` option, or the token file does not exist.
    #[error(
        "Error: file with OAuth token hasn't been found.\nUse 'token' command to authenticate and create this file"
    )]
    TokenMissing,

    /// `config.cfg` exists but is not a list of `key="value"` lines.
    #[error("Error: failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The config could not be rendered for writing.
    #[error("Error: failed to write config at {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    /// `dirs::home_dir()` returned `None` and no override was given.
    #[error("Error: cannot determine home directory; set $HOME or Sim_ConfDir/Sim_SyncDir")]
    HomeNotFound,

    /// Underlying I/O failure while reading or writing configuration files.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
