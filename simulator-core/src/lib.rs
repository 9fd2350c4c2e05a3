//! Simulator core library: domain types, configuration store, errors.
//!
//! - [`types`]: daemon state, trigger events, quota figures
//! - [`config`]: `config.cfg` setup and validation
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::{DaemonState, QuotaInfo, TriggerEvent};
