//! Simulated sync daemon: scripted state machine, command socket, and lifecycle.

pub mod engine;
mod error;
pub mod lifecycle;
pub mod logging;
pub mod paths;
pub mod protocol;
pub mod report;
mod runtime;
pub mod script;
pub mod session;

pub use engine::Engine;
pub use error::DaemonError;
pub use lifecycle::{detach, StartOutcome};
pub use protocol::{send_blocking, send_command, Command, Reply};
pub use runtime::{run, serve, start_blocking, DaemonConfig, Endpoint, MISSING_DIR_REPLY};
