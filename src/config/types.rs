//! Root configuration types.

use serde::{Deserialize, Serialize};

use super::defaults::{default_auth_store_path, default_backup_file, default_port};
use super::logging::LoggingConfig;
use super::peers::PeerMasterConfig;

/// Root configuration struct for the master server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// TCP port the master protocol listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path to the registry backup file, written every 60s and consulted at
    /// startup. No backup persistence if unset.
    #[serde(default = "default_backup_file")]
    pub backup_file: Option<String>,
    /// Peer masters to federate with.
    #[serde(default)]
    pub peers: Vec<PeerMasterConfig>,
    /// Path to the JSON auth store (`user_name -> {pubkey, flags}`). No
    /// privileged-player auth is available if unset.
    #[serde(default = "default_auth_store_path")]
    pub auth_store_path: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            backup_file: default_backup_file(),
            peers: Vec::new(),
            auth_store_path: default_auth_store_path(),
            logging: LoggingConfig::default(),
        }
    }
}
