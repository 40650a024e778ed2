//! Periodic snapshot of the registry to a flat backup file, and the startup
//! routine that reloads it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::record::ServerRecord;
use super::Registry;

pub const BACKUP_INTERVAL: Duration = Duration::from_secs(60);

/// Drives the 60-second backup-file refresh until the supplied token is
/// cancelled. The file is overwritten wholesale each pass; a write failure
/// is logged and the next tick tries again rather than tearing down the task.
pub async fn run(registry: Arc<Registry>, path: impl AsRef<Path>, cancel: CancellationToken) {
    let path = path.as_ref();
    let mut interval = tokio::time::interval(BACKUP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("backup task cancelled");
                return;
            }
            _ = interval.tick() => {
                if let Err(err) = write_backup(&registry, path).await {
                    tracing::warn!(path = %path.display(), error = %err, "failed to write registry backup");
                }
            }
        }
    }
}

async fn write_backup(registry: &Registry, path: &Path) -> std::io::Result<()> {
    let snapshot = registry.snapshot().await;
    let mut body = String::new();
    for record in &snapshot {
        body.push_str(&format!("{}:{}\n", record.ip, record.port));
    }

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body.as_bytes()).await?;
    file.flush().await?;
    tracing::debug!(path = %path.display(), count = snapshot.len(), "wrote registry backup");
    Ok(())
}

/// Reload a backup file at startup, re-probing every address it lists
/// before it is added to the registry. A missing file is not an error —
/// it just means there's nothing to restore.
pub async fn restore_from_file(registry: &Registry, path: impl AsRef<Path>) {
    let path = path.as_ref();
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no backup file found, starting with an empty registry");
            return;
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read backup file");
            return;
        }
    };

    let mut restored = 0usize;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_backup_line(line) {
            Some((ip, port)) => {
                let record = ServerRecord::new_local(ip, port, "master".to_string());
                if registry.add_or_update(record).await.is_some() {
                    restored += 1;
                }
            }
            None => {
                tracing::warn!(line, "skipping malformed backup line");
            }
        }
    }
    tracing::info!(restored, path = %path.display(), "restored registry from backup file");
}

fn parse_backup_line(line: &str) -> Option<(std::net::Ipv4Addr, u16)> {
    let (ip_part, port_part) = line.rsplit_once(':')?;
    let ip = ip_part.parse().ok()?;
    let port = port_part.parse().ok()?;
    Some((ip, port))
}
