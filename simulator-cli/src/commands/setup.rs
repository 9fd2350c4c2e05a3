//! `setup`: prepare the simulation environment without any prompts.

use anyhow::Result;

use simulator_core::config;

pub fn run() -> Result<()> {
    config::setup()?;
    Ok(())
}
