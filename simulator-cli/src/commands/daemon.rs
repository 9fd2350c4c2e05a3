//! `start`, `stop`, `status`, `sync`, `error`, and the hidden daemon role.

use std::path::Path;

use anyhow::{Context, Result};

use simulator_core::config;
use simulator_daemon::lifecycle::{self, StartOutcome};
use simulator_daemon::paths::socket_path;
use simulator_daemon::{detach, send_blocking, start_blocking, Command, Reply};

/// Check the configuration and launch the daemon in the background.
pub fn start() -> Result<()> {
    let sync_dir = config::check_config()?;
    let exe = std::env::current_exe().context("could not determine own executable")?;

    match lifecycle::start(&exe, &sync_dir, &socket_path()) {
        Ok(StartOutcome::AlreadyRunning) => println!("Daemon is already running."),
        Ok(StartOutcome::Started) => println!("Starting daemon process...Done"),
        Err(err) => {
            println!("Starting daemon process...Fail");
            return Err(err.into());
        }
    }
    Ok(())
}

/// Pass `command` to the running daemon and print what it answers.
pub fn send(command: Command) -> Result<()> {
    match send_blocking(&socket_path(), command)? {
        Reply::Stopped => println!("Daemon stopped."),
        Reply::Ack => {}
        Reply::Message(text) => println!("{text}"),
    }
    Ok(())
}

/// Leave the controlling terminal's session and serve until stopped.
pub fn serve(sync_dir: &Path) -> Result<()> {
    detach()?;
    start_blocking(sync_dir)?;
    Ok(())
}
