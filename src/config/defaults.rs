//! Default value functions for configuration fields.
//!
//! Used by serde's `#[serde(default = ...)]` attributes throughout the
//! configuration system.

use super::logging::LogFormat;

// =============================================================================
// Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    28800
}

pub const fn default_backup_file() -> Option<String> {
    None
}

pub const fn default_auth_store_path() -> Option<String> {
    None
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
