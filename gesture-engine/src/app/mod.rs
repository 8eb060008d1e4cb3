//! Host-facing surface
//!
//! The `gesture-engine` command line and the TOML configuration it loads.

pub mod cli;
pub mod config;

pub use cli::Cli;
pub use config::Config;
