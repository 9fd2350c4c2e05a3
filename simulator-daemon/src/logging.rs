use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{io_err, DaemonError};

/// Send `tracing` output to `log_path`, appending. `RUST_LOG` overrides the
/// default `info` level. A second call in the same process is a no-op.
pub fn init(log_path: &Path) -> Result<(), DaemonError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| io_err(log_path, e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
    Ok(())
}
