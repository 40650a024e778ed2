//! The Supervisor: owns the registry and auth store, binds the listener,
//! and drives the three periodic maintenance tasks through their lifecycle.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthStore;
use crate::config::Config;
use crate::error::MasterError;
use crate::net::{RemoteMasterClient, UdpPinger};
use crate::protocol;
use crate::registry::{backup, federation, prune, Registry};

enum State {
    Unstarted,
    Running,
    Stopped,
}

struct RunningTasks {
    cancel: CancellationToken,
    acceptor: JoinHandle<()>,
    prune: JoinHandle<()>,
    federation: JoinHandle<()>,
    backup: JoinHandle<()>,
}

/// Owns the registry and auth store for the process lifetime and manages
/// the Unstarted -> Running -> Stopped lifecycle. No process-wide
/// singletons: everything a connection handler needs is reached through a
/// `Supervisor` reference.
pub struct Supervisor {
    port: u16,
    backup_file: Option<PathBuf>,
    peers: Vec<RemoteMasterClient>,
    registry: Arc<Registry>,
    auth_store: Arc<AuthStore>,
    state: Mutex<State>,
    tasks: Mutex<Option<RunningTasks>>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: &Config, auth_store: AuthStore) -> Self {
        let peers = config
            .peers
            .iter()
            .map(|peer| RemoteMasterClient::new(peer.host.clone(), peer.port))
            .collect();

        Self {
            port: config.port,
            backup_file: config.backup_file.clone().map(PathBuf::from),
            peers,
            registry: Arc::new(Registry::new(Arc::new(UdpPinger))),
            auth_store: Arc::new(auth_store),
            state: Mutex::new(State::Unstarted),
            tasks: Mutex::new(None),
        }
    }

    /// A handle to the registry, for tests and diagnostics.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Bind the listener, restore the backup file if configured, and start
    /// the acceptor plus the three periodic tasks. Errors if already
    /// started.
    pub async fn start_server(&self) -> Result<(), MasterError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, State::Unstarted) {
            return Err(MasterError::AlreadyStarted);
        }

        if let Some(path) = &self.backup_file {
            backup::restore_from_file(&self.registry, path).await;
        }

        let addr = SocketAddr::new(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), self.port);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "master listening");

        let cancel = CancellationToken::new();

        let acceptor = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.registry),
            Arc::clone(&self.auth_store),
            cancel.clone(),
        ));

        let prune_handle = tokio::spawn(prune::run(Arc::clone(&self.registry), cancel.clone()));
        let federation_handle = tokio::spawn(federation::run(
            Arc::clone(&self.registry),
            self.peers.clone(),
            cancel.clone(),
        ));
        let backup_handle = match self.backup_file.clone() {
            Some(path) => tokio::spawn(backup::run(Arc::clone(&self.registry), path, cancel.clone())),
            None => tokio::spawn(std::future::ready(())),
        };

        *self.tasks.lock().await = Some(RunningTasks {
            cancel,
            acceptor,
            prune: prune_handle,
            federation: federation_handle,
            backup: backup_handle,
        });
        *state = State::Running;
        Ok(())
    }

    /// Cancel the periodic tasks and stop accepting new connections.
    /// In-flight connections drain on their own; this does not forcibly
    /// close them. Errors if not currently running.
    pub async fn stop_server(&self) -> Result<(), MasterError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, State::Running) {
            return Err(MasterError::NotRunning);
        }

        let tasks = self
            .tasks
            .lock()
            .await
            .take()
            .expect("Running state implies tasks were recorded by start_server");

        tasks.cancel.cancel();
        tasks.acceptor.abort();
        let _ = tasks.prune.await;
        let _ = tasks.federation.await;
        let _ = tasks.backup.await;

        *state = State::Stopped;
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    registry: Arc<Registry>,
    auth_store: Arc<AuthStore>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("acceptor cancelled");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let IpAddr::V4(peer_ip) = addr.ip() else {
                            tracing::warn!(%addr, "rejecting non-IPv4 connection");
                            continue;
                        };
                        let registry = Arc::clone(&registry);
                        let auth_store = Arc::clone(&auth_store);
                        tokio::spawn(async move {
                            protocol::handle_connection(stream, peer_ip, registry, auth_store).await;
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(port: u16) -> Config {
        Config {
            port,
            backup_file: None,
            peers: Vec::new(),
            auth_store_path: None,
            logging: crate::config::LoggingConfig::default(),
        }
    }

    #[tokio::test]
    async fn start_twice_is_an_error() {
        let supervisor = Supervisor::new(&test_config(0), AuthStore::empty());
        supervisor.start_server().await.expect("first start");
        let err = supervisor.start_server().await.unwrap_err();
        assert!(matches!(err, MasterError::AlreadyStarted));
        supervisor.stop_server().await.expect("stop");
    }

    #[tokio::test]
    async fn stop_before_start_is_an_error() {
        let supervisor = Supervisor::new(&test_config(0), AuthStore::empty());
        let err = supervisor.stop_server().await.unwrap_err();
        assert!(matches!(err, MasterError::NotRunning));
    }

    #[tokio::test]
    async fn stop_twice_is_an_error() {
        let supervisor = Supervisor::new(&test_config(0), AuthStore::empty());
        supervisor.start_server().await.expect("start");
        supervisor.stop_server().await.expect("first stop");
        let err = supervisor.stop_server().await.unwrap_err();
        assert!(matches!(err, MasterError::NotRunning));
    }

    #[tokio::test]
    async fn start_then_stop_cleanly_releases_the_port() {
        let supervisor = Supervisor::new(&test_config(0), AuthStore::empty());
        supervisor.start_server().await.expect("start");
        assert!(supervisor.registry().snapshot().await.is_empty());
        supervisor.stop_server().await.expect("stop");
    }
}
