#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_arguments
)]

//! # Cube2 Master Server
//!
//! The master directory for a community of Cube2-engine game servers: a
//! concurrent TCP registration and listing protocol, a UDP reachability
//! prober, and periodic federation with peer masters.

/// Challenge/response authentication for privileged players.
pub mod auth;

/// The Cube2 text codec and the UDP info-reply wire format.
pub mod codec;

/// Configuration loading, validation and defaults.
pub mod config;

/// The top-level error type unifying per-component errors.
pub mod error;

/// Structured logging setup.
pub mod logging;

/// UDP reachability probing and the peer-master scrape client.
pub mod net;

/// The TCP line-protocol state machine.
pub mod protocol;

/// The deduplicated server registry and its periodic maintenance tasks.
pub mod registry;

/// The Supervisor: process lifecycle and task orchestration.
pub mod server;

pub use error::MasterError;
