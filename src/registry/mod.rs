//! The deduplicated set of known servers, protected by a single mutex.

pub mod backup;
pub mod federation;
pub mod prune;
pub mod record;

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

use crate::codec::QueryReply;
use crate::net::Pinger;

pub use record::{PeerMasterOrigin, ServerRecord};

pub type Identity = (Ipv4Addr, u16);

/// A registry slot. `PendingProbe` exists so that a probe-in-flight for one
/// identity does not hold the registry mutex for its whole duration:
/// concurrent registrations for the *same* identity join the existing
/// probe's result instead of starting a second one; registrations for
/// *other* identities are never blocked by it.
enum Slot {
    Present(ServerRecord),
    PendingProbe(broadcast::Sender<Option<ServerRecord>>),
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("server is already registered under a different address and its address is immutable")]
    ImmutableIp,
}

/// The registry. The only shared mutable state in the process.
pub struct Registry {
    servers: Mutex<HashMap<Identity, Slot>>,
    pinger: Arc<dyn Pinger>,
}

impl Registry {
    #[must_use]
    pub fn new(pinger: Arc<dyn Pinger>) -> Self {
        Self {
            servers: Mutex::new(HashMap::new()),
            pinger,
        }
    }

    /// A deep copy of every currently-listed record, safe to iterate without
    /// holding the lock.
    pub async fn snapshot(&self) -> Vec<ServerRecord> {
        self.servers
            .lock()
            .await
            .values()
            .filter_map(|slot| match slot {
                Slot::Present(record) => Some(record.clone()),
                Slot::PendingProbe(_) => None,
            })
            .collect()
    }

    /// Build a candidate from a connection's `server` command and register
    /// it, applying the private-IP override rule. `existing` is the
    /// identity the calling connection is already registered under, if any
    /// — once set, the IP component is immutable.
    pub async fn register(
        &self,
        existing: Option<Identity>,
        peer_host: Ipv4Addr,
        serverip: &str,
        port: u16,
        branch: String,
    ) -> Result<Option<ServerRecord>, RegisterError> {
        let ip = resolve_ip(peer_host, serverip);

        if let Some((existing_ip, existing_port)) = existing {
            if ip != existing_ip || port != existing_port {
                return Err(RegisterError::ImmutableIp);
            }
        }

        let record = ServerRecord::new_local(ip, port, branch);
        Ok(self.add_or_update(record).await)
    }

    /// Insert or refresh a record. If its identity is already listed, the
    /// payload is replaced in place with no re-probe. Otherwise the
    /// candidate is probed; on success its description is filled in from
    /// the parsed reply and it is inserted, on failure it is discarded.
    pub async fn add_or_update(&self, mut record: ServerRecord) -> Option<ServerRecord> {
        let identity = record.identity();

        let tx = {
            let mut servers = self.servers.lock().await;
            match servers.get(&identity) {
                Some(Slot::Present(_)) => {
                    servers.insert(identity, Slot::Present(record.clone()));
                    return Some(record);
                }
                Some(Slot::PendingProbe(tx)) => {
                    let mut rx = tx.subscribe();
                    drop(servers);
                    return rx.recv().await.ok().flatten();
                }
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    servers.insert(identity, Slot::PendingProbe(tx.clone()));
                    tx
                }
            }
        };

        let outcome = match self.pinger.ping(record.ip, record.port).await {
            Ok(datagram) => match QueryReply::parse(&datagram) {
                Ok(reply) => {
                    record.set_description(reply.description);
                    Some(record)
                }
                Err(err) => {
                    tracing::warn!(ip = %record.ip, port = record.port, error = %err, "discarding unparseable info reply");
                    None
                }
            },
            Err(err) => {
                tracing::debug!(ip = %record.ip, port = record.port, error = %err, "probe failed, server will not be listed");
                None
            }
        };

        let mut servers = self.servers.lock().await;
        match &outcome {
            Some(record) => {
                servers.insert(identity, Slot::Present(record.clone()));
            }
            None => {
                servers.remove(&identity);
            }
        }
        drop(servers);

        let _ = tx.send(outcome.clone());
        outcome
    }

    /// Remove a record by identity. Returns `true` if it was present.
    pub async fn remove(&self, identity: Identity) -> bool {
        matches!(
            self.servers.lock().await.remove(&identity),
            Some(Slot::Present(_))
        )
    }

    pub(crate) fn pinger(&self) -> Arc<dyn Pinger> {
        Arc::clone(&self.pinger)
    }

    /// Re-probe every currently-listed server concurrently, then atomically
    /// evict the ones that stopped responding and refresh the description of
    /// the ones that didn't. Registrations that land during the probing
    /// window are untouched — only identities present in the snapshot this
    /// call started with are ever removed or reinserted.
    pub async fn reping_and_prune(&self) {
        let snapshot = self.snapshot().await;

        let mut join_set = tokio::task::JoinSet::new();
        for record in snapshot {
            let pinger = Arc::clone(&self.pinger);
            join_set.spawn(async move {
                let reply = pinger.ping(record.ip, record.port).await;
                (record, reply)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok(pair) = joined {
                results.push(pair);
            }
        }

        let mut servers = self.servers.lock().await;
        for (mut record, ping_result) in results {
            let identity = record.identity();
            servers.remove(&identity);
            if let Ok(datagram) = ping_result {
                if let Ok(reply) = QueryReply::parse(&datagram) {
                    record.set_description(reply.description);
                    servers.insert(identity, Slot::Present(record));
                }
            }
        }
    }
}

fn resolve_ip(peer_host: Ipv4Addr, serverip: &str) -> Ipv4Addr {
    if peer_host.is_private() && !serverip.is_empty() && serverip != "*" {
        if let Ok(overridden) = serverip.parse::<Ipv4Addr>() {
            return overridden;
        }
    }
    peer_host
}
