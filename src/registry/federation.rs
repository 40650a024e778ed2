//! Periodic federation: pull each configured peer master's server list and
//! fold it into the local registry.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::net::RemoteMasterClient;

use super::Registry;

pub const FEDERATION_INTERVAL: Duration = Duration::from_secs(60);

/// Drives the 60-second federation cycle until the supplied token is
/// cancelled. Each peer is scraped independently; one peer being down or
/// returning garbage never stops the others from being polled.
pub async fn run(registry: Arc<Registry>, peers: Vec<RemoteMasterClient>, cancel: CancellationToken) {
    if peers.is_empty() {
        return;
    }

    let mut interval = tokio::time::interval(FEDERATION_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("federation task cancelled");
                return;
            }
            _ = interval.tick() => {
                tracing::debug!(peer_count = peers.len(), "running federation pass");
                for peer in &peers {
                    sync_peer(&registry, peer).await;
                }
            }
        }
    }
}

async fn sync_peer(registry: &Registry, peer: &RemoteMasterClient) {
    match peer.list_servers().await {
        Ok(records) => {
            tracing::debug!(peer = %peer.host, count = records.len(), "federated server list fetched");
            for mut record in records {
                // Federated entries rank below anything registered directly
                // against this master, and are still re-probed here: a peer
                // can only tell us a server exists, not that it's reachable
                // from this master's vantage point.
                record.priority = 0;
                registry.add_or_update(record).await;
            }
        }
        Err(err) => {
            tracing::warn!(peer = %peer.host, port = peer.port, error = %err, "federation scrape failed");
        }
    }
}
