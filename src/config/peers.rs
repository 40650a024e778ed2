//! Configured peer masters to federate with.

use serde::{Deserialize, Serialize};

/// One entry in `config.peers`: a master to periodically scrape via `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMasterConfig {
    pub host: String,
    pub port: u16,
}
