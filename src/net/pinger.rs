//! UDP client for the Cube2 "info" probe.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::codec::PROBE_REQUEST;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum PingError {
    #[error("no reply after {0} attempts")]
    Timeout(u32),

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// Abstraction over "send the info probe, wait for one datagram back",
/// so the registry can be tested against a canned reply without a real
/// socket round-trip.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ip: Ipv4Addr, game_port: u16) -> Result<Vec<u8>, PingError>;
}

/// The real UDP pinger. Each `ping()` call opens and owns its own socket;
/// there is no shared long-lived state.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpPinger;

impl UdpPinger {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn info_port(game_port: u16) -> u16 {
        game_port + 1
    }
}

#[async_trait]
impl Pinger for UdpPinger {
    async fn ping(&self, ip: Ipv4Addr, game_port: u16) -> Result<Vec<u8>, PingError> {
        let info_port = Self::info_port(game_port);
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect((ip, info_port)).await?;

        let mut buf = [0u8; 2048];
        for _attempt in 0..MAX_ATTEMPTS {
            socket.send(&PROBE_REQUEST).await?;
            match tokio::time::timeout(ATTEMPT_TIMEOUT, socket.recv(&mut buf)).await {
                Ok(Ok(n)) => return Ok(buf[..n].to_vec()),
                Ok(Err(e)) => return Err(PingError::Socket(e)),
                Err(_elapsed) => continue,
            }
        }

        Err(PingError::Timeout(MAX_ATTEMPTS))
    }
}
