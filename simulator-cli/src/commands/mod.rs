pub mod daemon;
pub mod setup;
