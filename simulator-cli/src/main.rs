//! yandex-disk-simulator: stand-in for the yandex-disk client daemon.
//!
//! # Usage
//!
//! ```text
//! yandex-disk-simulator setup
//! yandex-disk-simulator start|stop|status|sync|error
//! ```
//!
//! `Sim_SyncDir` and `Sim_ConfDir` override the default synchronized directory
//! (`~/Yandex.Disk`) and configuration directory (`~/.config/yandex-disk`).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};

use simulator_daemon::paths::daemon_log_path;
use simulator_daemon::{logging, Command};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "yandex-disk-simulator",
    version,
    about = "Simulates the yandex-disk client daemon for indicator testing",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the daemon and begin the start-up simulation.
    Start,

    /// Stop the daemon.
    Stop,

    /// Print the daemon status.
    Status,

    /// Begin the synchronization simulation.
    Sync,

    /// Begin the error simulation (idle -> error for 0.5 s -> idle).
    Error,

    /// Create the configuration and token files in Sim_ConfDir and the
    /// synchronized directory in Sim_SyncDir.
    Setup,

    /// Print the version.
    #[command(short_flag = 'v')]
    Version,

    /// Run as the daemon itself. Used internally by `start`.
    #[command(hide = true)]
    Daemon {
        /// Directory the daemon pretends to synchronize.
        sync_dir: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

const NO_COMMAND: &str = "Error: command hasn't been specified. Use the --help command to access help\n\
                          or setup to launch the setup wizard.";

/// Longest command name echoed back in an unknown-command error.
const COMMAND_ECHO_LEN: usize = 8;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_error(err),
    };

    if let Err(err) = logging::init(&daemon_log_path()) {
        println!("{err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Start => commands::daemon::start(),
        Commands::Stop => commands::daemon::send(Command::Stop),
        Commands::Status => commands::daemon::send(Command::Status),
        Commands::Sync => commands::daemon::send(Command::Sync),
        Commands::Error => commands::daemon::send(Command::Error),
        Commands::Setup => commands::setup::run(),
        Commands::Version => {
            println!("{}\n    version: {}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Daemon { sync_dir } => commands::daemon::serve(&sync_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Report a command-line parse failure the way every other error is reported:
/// one `Error:` line on stdout and exit code 1. Help and version go through clap.
fn usage_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            println!("{NO_COMMAND}");
        }
        _ => match unknown_command(&err) {
            Some(command) => {
                let command: String = command.chars().take(COMMAND_ECHO_LEN).collect();
                println!("Error: unknown command: '{command}'");
            }
            None => {
                let rendered = err.render().to_string();
                let message = rendered.lines().next().unwrap_or_default();
                println!("Error: {}", message.trim_start_matches("error: "));
            }
        },
    }
    ExitCode::FAILURE
}

/// The rejected token, when it is the command word itself.
fn unknown_command(err: &clap::Error) -> Option<String> {
    let context = match err.kind() {
        ErrorKind::InvalidSubcommand => ContextKind::InvalidSubcommand,
        ErrorKind::UnknownArgument => ContextKind::InvalidArg,
        _ => return None,
    };
    let Some(ContextValue::String(rejected)) = err.get(context) else {
        return None;
    };
    let first = std::env::args().nth(1)?;
    (*rejected == first).then_some(first)
}
