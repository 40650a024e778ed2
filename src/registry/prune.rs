//! Periodic re-ping and eviction of unreachable servers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::Registry;

pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Drives the 60-second re-ping/prune cycle until the supplied token is
/// cancelled. Mirrors the shape of the teacher's maintenance loop: each
/// tick's body can't abort the loop, it can only log and continue.
pub async fn run(registry: Arc<Registry>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("prune task cancelled");
                return;
            }
            _ = interval.tick() => {
                tracing::debug!("running registry prune pass");
                registry.reping_and_prune().await;
            }
        }
    }
}
