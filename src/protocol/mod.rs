//! The TCP line-protocol: command parsing and the per-connection state
//! machine built on top of it.

pub mod commands;
pub mod connection;
pub mod pending_auth;

pub use commands::{Command, CommandError};
pub use connection::handle_connection;
pub use pending_auth::PendingAuthTable;
