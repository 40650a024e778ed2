//! Configuration validation functions.

use super::Config;

/// Sanity-check a loaded configuration. Unlike the loader, which always
/// produces *some* `Config`, this is the hard-failure path `main.rs` uses
/// for `--validate-config` and for refusing to start with nonsensical
/// settings.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.port == 0 {
        anyhow::bail!("port must be non-zero");
    }

    for peer in &config.peers {
        if peer.host.trim().is_empty() {
            anyhow::bail!("a configured peer master has an empty host");
        }
        if peer.port == 0 {
            anyhow::bail!("peer master '{}' has port 0", peer.host);
        }
    }

    if let Some(path) = &config.auth_store_path {
        if path.trim().is_empty() {
            anyhow::bail!("auth_store_path is set but empty");
        }
    }

    if let Some(path) = &config.backup_file {
        if path.trim().is_empty() {
            anyhow::bail!("backup_file is set but empty");
        }
    }

    Ok(())
}
