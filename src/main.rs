#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use cube2_master::auth::AuthStore;
use cube2_master::config;
use cube2_master::logging;
use cube2_master::server::Supervisor;

/// Master directory server for Cube2-engine game servers.
#[derive(Parser, Debug)]
#[command(name = "cube2-masterd")]
#[command(about = "Master/registry server for Cube2-engine game servers")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Backup file: {:?}", cfg.backup_file);
                println!("  Peer masters: {}", cfg.peers.len());
                println!("  Auth store: {:?}", cfg.auth_store_path);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let auth_store = match &cfg.auth_store_path {
        Some(path) => AuthStore::load(std::path::Path::new(path))?,
        None => {
            tracing::warn!("no auth_store_path configured, privileged-player auth is unavailable");
            AuthStore::empty()
        }
    };

    tracing::info!(port = cfg.port, peers = cfg.peers.len(), "starting master server");

    let supervisor = Supervisor::new(&cfg, auth_store);
    supervisor.start_server().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    supervisor.stop_server().await?;

    Ok(())
}
