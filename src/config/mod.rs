//! Configuration for the master server.
//!
//! Supports JSON configuration files, environment variable overrides, stdin
//! input, and compiled-in defaults.
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`peers`]: Configured peer masters
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod peers;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use peers::PeerMasterConfig;
pub use types::Config;
pub use validation::validate_config;
