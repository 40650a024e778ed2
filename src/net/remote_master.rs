//! TCP client that scrapes a peer master's server list via `update`.

use std::net::Ipv4Addr;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::codec::cube2;
use crate::registry::record::{PeerMasterOrigin, ServerRecord};

#[derive(Debug, Error)]
pub enum RemoteMasterError {
    #[error("could not connect to peer master: {0}")]
    Connect(#[source] std::io::Error),
    #[error("I/O error talking to peer master: {0}")]
    Io(#[from] std::io::Error),
}

fn addserver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^addserver\s+(\S+)\s+(\d+)\s+(-?\d+)\s+"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"\s+"([^"]*)"\s*$"#,
        )
        .expect("addserver regex is a valid, fixed pattern")
    })
}

/// A configured peer master to federate with. Stateless except for its
/// in-flight `update` exchange.
#[derive(Debug, Clone)]
pub struct RemoteMasterClient {
    pub host: String,
    pub port: u16,
}

impl RemoteMasterClient {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Connect, send `update`, and parse every `addserver` line until EOF.
    /// A single malformed line is skipped rather than aborting the scrape.
    pub async fn list_servers(&self) -> Result<Vec<ServerRecord>, RemoteMasterError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(RemoteMasterError::Connect)?;

        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"update\n").await?;
        write_half.shutdown().await?;

        let mut reader = BufReader::new(read_half);
        let mut records = Vec::new();

        loop {
            let Some(line) = read_decoded_line(&mut reader).await? else {
                break; // EOF
            };
            if !line.starts_with("addserver") {
                continue;
            }
            match parse_addserver_line(&line, &self.host, self.port) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(line = %line, peer = %self.host, "skipping malformed addserver line");
                }
            }
        }

        Ok(records)
    }
}

/// Read one line, stripped of its terminator and decoded through the Cube2
/// codec — every wire string, `addserver` fields included, is Cube2-encoded.
/// `Ok(None)` on clean EOF before any bytes were read.
async fn read_decoded_line<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    let n = reader.read_until(b'\n', &mut raw).await?;
    if n == 0 {
        return Ok(None);
    }
    if raw.last() == Some(&b'\n') {
        raw.pop();
    }
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Ok(Some(cube2::decode(&raw)))
}

fn parse_addserver_line(line: &str, peer_host: &str, peer_port: u16) -> Option<ServerRecord> {
    let caps = addserver_regex().captures(line)?;
    let ip: Ipv4Addr = caps.get(1)?.as_str().parse().ok()?;
    let port: u16 = caps.get(2)?.as_str().parse().ok()?;
    let priority: i32 = caps.get(3)?.as_str().parse().ok()?;
    let description = caps.get(4)?.as_str().to_string();
    let auth_handle = caps.get(5)?.as_str().to_string();
    let role = caps.get(6)?.as_str().to_string();
    let branch = caps.get(7)?.as_str().to_string();

    Some(ServerRecord {
        ip,
        port,
        priority,
        description,
        auth_handle,
        role,
        branch,
        remote_master: Some(PeerMasterOrigin {
            host: peer_host.to_string(),
            port: peer_port,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_addserver_line() {
        let line =
            r#"addserver 203.0.113.5 28800 10 "Einherjer Europe" "handle" "admin" "master""#;
        let record = parse_addserver_line(line, "peer.example", 28800).expect("parse");
        assert_eq!(record.ip, Ipv4Addr::new(203, 0, 113, 5));
        assert_eq!(record.port, 28800);
        assert_eq!(record.priority, 10);
        assert_eq!(record.description, "Einherjer Europe");
        assert_eq!(record.auth_handle, "handle");
        assert_eq!(record.role, "admin");
        assert_eq!(record.branch, "master");
        assert_eq!(
            record.remote_master.as_ref().map(|p| p.host.as_str()),
            Some("peer.example")
        );
    }

    #[test]
    fn non_addserver_lines_are_not_parsed() {
        assert!(parse_addserver_line("setversion 160 230", "peer", 28800).is_none());
    }

    #[test]
    fn malformed_addserver_line_is_skipped_not_panicked() {
        assert!(parse_addserver_line("addserver not-an-ip", "peer", 28800).is_none());
    }

    #[tokio::test]
    async fn list_servers_decodes_cube2_fields_and_skips_bad_lines() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut body = cube2::encode(
                r#"addserver 203.0.113.5 28800 10 "Einherjer Europe [äöü]" "handle" "admin" "master""#,
            );
            body.push(b'\n');
            body.extend_from_slice(b"not an addserver line at all\n");
            body.extend_from_slice(b"addserver totally-malformed\n");
            stream.write_all(&body).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let client = RemoteMasterClient::new(addr.ip().to_string(), addr.port());
        let records = client.list_servers().await.expect("scrape succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Einherjer Europe [äöü]");
    }
}
