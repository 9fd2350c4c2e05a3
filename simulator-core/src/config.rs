//! Simulator configuration store.
//!
//! # Storage layout
//!
//! ```text
//! $Sim_ConfDir/                 (default ~/.config/yandex-disk)
//!   config.cfg                  `key = "value"` lines: proxy, auth, dir
//!   passwd                      placeholder OAuth token
//! $Sim_SyncDir/                 (default ~/Yandex.Disk)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(conf_dir, …)`: explicit directories; used in tests with `TempDir`
//! - `fn()`: resolves directories from the environment, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Overrides the synchronized directory.
pub const SYNC_DIR_ENV: &str = "Sim_SyncDir";
/// Overrides the configuration directory.
pub const CONF_DIR_ENV: &str = "Sim_ConfDir";

pub const CONFIG_FILE: &str = "config.cfg";
pub const TOKEN_FILE: &str = "passwd";

/// The simulator never talks to the real service, so any token will do.
const PLACEHOLDER_TOKEN: &str = "token";

// ---------------------------------------------------------------------------
// 1. Directory resolution
// ---------------------------------------------------------------------------

/// Configuration directory: `$Sim_ConfDir` or `~/.config/yandex-disk`.
pub fn conf_dir() -> Result<PathBuf, ConfigError> {
    dir_from_env(CONF_DIR_ENV, &[".config", "yandex-disk"])
}

/// Synchronized directory: `$Sim_SyncDir` or `~/Yandex.Disk`.
pub fn sync_dir() -> Result<PathBuf, ConfigError> {
    dir_from_env(SYNC_DIR_ENV, &["Yandex.Disk"])
}

fn dir_from_env(var: &str, default_under_home: &[&str]) -> Result<PathBuf, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(expand(&value)),
        _ => {
            let mut dir = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
            dir.extend(default_under_home);
            Ok(dir)
        }
    }
}

/// Expand `~` and `$VAR` references; unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// `<conf_dir>/config.cfg`: pure, no I/O.
pub fn config_path_at(conf_dir: &Path) -> PathBuf {
    conf_dir.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// 2. Check
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dir: Option<String>,
}

/// Validates the configuration and returns the synchronized directory.
///
/// # Errors
/// - [`ConfigError::DirMissing`]: no config file, no `dir` option, or the
///   directory does not exist.
/// - [`ConfigError::TokenMissing`]: no `auth` option, or the token file does
///   not exist.
/// - [`ConfigError::Parse`]: the file is not a list of `key="value"` lines.
pub fn check_config_at(conf_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(conf_dir);
    tracing::debug!(path = %path.display(), "reading config file");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::DirMissing)
        }
        Err(err) => return Err(io_err(&path, err)),
    };
    let parsed: ConfigFile =
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;

    let dir = parsed
        .dir
        .filter(|dir| !dir.is_empty())
        .map(|dir| expand(&dir))
        .filter(|dir| dir.exists())
        .ok_or(ConfigError::DirMissing)?;

    parsed
        .auth
        .filter(|auth| !auth.is_empty())
        .map(|auth| expand(&auth))
        .filter(|auth| auth.exists())
        .ok_or(ConfigError::TokenMissing)?;

    Ok(dir)
}

/// `check_config_at` convenience wrapper.
pub fn check_config() -> Result<PathBuf, ConfigError> {
    check_config_at(&conf_dir()?)
}

// ---------------------------------------------------------------------------
// 3. Setup
// ---------------------------------------------------------------------------

/// Prepares a fresh simulation environment.
///
/// Creates `conf_dir`, a placeholder token file (kept if already present),
/// rewrites `config.cfg` to point at both, and creates `sync_dir`.
pub fn setup_at(conf_dir: &Path, sync_dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(conf_dir).map_err(|e| io_err(conf_dir, e))?;

    let token = conf_dir.join(TOKEN_FILE);
    if !token.exists() {
        std::fs::write(&token, PLACEHOLDER_TOKEN).map_err(|e| io_err(&token, e))?;
        set_file_permissions(&token)?;
    }

    let path = config_path_at(conf_dir);
    let config = ConfigFile {
        proxy: Some("no".to_string()),
        auth: Some(token.to_string_lossy().into_owned()),
        dir: Some(sync_dir.to_string_lossy().into_owned()),
    };
    let content = toml::to_string(&config).map_err(|source| ConfigError::Serialize {
        path: path.clone(),
        source,
    })?;
    // Replaced through a sibling `.tmp` file and a rename.
    let tmp = path.with_file_name(format!("{CONFIG_FILE}.tmp"));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;

    std::fs::create_dir_all(sync_dir).map_err(|e| io_err(sync_dir, e))?;
    tracing::info!(
        config = %path.display(),
        sync_dir = %sync_dir.display(),
        "simulation environment prepared"
    );
    Ok(())
}

/// `setup_at` convenience wrapper.
pub fn setup() -> Result<(), ConfigError> {
    setup_at(&conf_dir()?, &sync_dir()?)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
