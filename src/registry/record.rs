//! The server record: identity is `(ip, port)` only, everything else is
//! mutable payload.

use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;

use serde::Serialize;

/// A small immutable descriptor of the peer master a federated record came
/// from, copied into the record rather than held by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerMasterOrigin {
    pub host: String,
    pub port: u16,
}

/// One entry in the registry. Equality and hashing consider only
/// `(ip, port)` — two records with the same identity but different
/// `description`/`priority`/etc. are the same record for set purposes.
#[derive(Debug, Clone, Serialize)]
pub struct ServerRecord {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub priority: i32,
    pub description: String,
    pub auth_handle: String,
    pub role: String,
    pub branch: String,
    pub remote_master: Option<PeerMasterOrigin>,
}

impl ServerRecord {
    pub const MAX_DESCRIPTION_LEN: usize = 80;

    /// A freshly-registered local record: priority 10, no payload yet.
    #[must_use]
    pub fn new_local(ip: Ipv4Addr, port: u16, branch: String) -> Self {
        Self {
            ip,
            port,
            priority: 10,
            description: String::new(),
            auth_handle: String::new(),
            role: String::new(),
            branch,
            remote_master: None,
        }
    }

    /// The UDP port the info probe is sent to.
    #[must_use]
    pub fn info_port(&self) -> u16 {
        self.port + 1
    }

    /// The identity this record occupies in the registry.
    #[must_use]
    pub fn identity(&self) -> (Ipv4Addr, u16) {
        (self.ip, self.port)
    }

    /// Render the exact `addserver` line body emitted in an `update` reply,
    /// including the literal quoting of empty fields.
    #[must_use]
    pub fn addserver_line(&self) -> String {
        format!(
            "addserver {} {} {} \"{}\" \"{}\" \"{}\" \"{}\"",
            self.ip,
            self.port,
            self.priority,
            self.description,
            self.auth_handle,
            self.role,
            self.branch
        )
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description.chars().take(Self::MAX_DESCRIPTION_LEN).collect();
    }
}

impl PartialEq for ServerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

impl Eq for ServerRecord {}

impl Hash for ServerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ip.hash(state);
        self.port.hash(state);
    }
}
