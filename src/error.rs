//! Top-level error type unifying the per-component errors.

use thiserror::Error;

use crate::auth::AuthError;
use crate::net::PingError;
use crate::protocol::CommandError;

/// Errors that can surface while the master server is running.
///
/// Most of these are per-connection and non-fatal: the connection handler
/// reports the offending command back over the wire and keeps the socket
/// open. Only the `Io` and `Config` variants are fatal at startup.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Ping(#[from] PingError),

    #[error("duplicate registry insert for an identity that should have been replaced")]
    RegistryDuplicateInsert,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server already started")]
    AlreadyStarted,

    #[error("server is not running")]
    NotRunning,
}
