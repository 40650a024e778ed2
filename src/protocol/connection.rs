//! Per-connection state machine: dispatches the first line, then drives the
//! server-session loop until EOF.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::auth::AuthStore;
use crate::codec::cube2;
use crate::registry::{Identity, RegisterError, Registry};

use super::commands::{parse_line, Command, CommandError};
use super::pending_auth::PendingAuthTable;

/// Handle one accepted connection end to end. Never panics on malformed
/// input: protocol errors are reported on the wire and the connection is
/// closed, the listener and other connections are unaffected.
pub async fn handle_connection(
    stream: TcpStream,
    peer_ip: Ipv4Addr,
    registry: Arc<Registry>,
    auth_store: Arc<AuthStore>,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = write_half;

    let first_line = match read_decoded_line(&mut reader).await {
        Ok(Some(line)) => line,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(peer = %peer_ip, error = %err, "failed to read first line");
            return;
        }
    };

    if first_line.trim().is_empty() {
        tracing::debug!(peer = %peer_ip, "empty first line, closing connection");
        return;
    }

    match parse_line(&first_line) {
        Ok(Command::Update) => {
            handle_update(&mut writer, &registry).await;
        }
        Ok(command @ (Command::Server { .. } | Command::ReqAuth { .. } | Command::ConfAuth { .. })) => {
            run_server_session(&mut reader, &mut writer, peer_ip, &registry, &auth_store, command)
                .await;
        }
        Err(err) => {
            write_error(&mut writer, &err).await;
        }
    }
}

/// Read one line, stripped of its terminator and decoded through the Cube2
/// codec. `Ok(None)` on clean EOF before any bytes were read.
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

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut encoded = cube2::encode(line);
    encoded.push(b'\n');
    writer.write_all(&encoded).await
}

async fn write_error<W>(writer: &mut W, err: &CommandError)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let line = format!(r#"error "{err}""#);
    if let Err(io_err) = write_line(writer, &line).await {
        tracing::debug!(error = %io_err, "failed to write error reply");
    }
}

async fn handle_update<W>(writer: &mut W, registry: &Registry)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let snapshot = registry.snapshot().await;

    if write_line(writer, "setversion 160 230").await.is_err() {
        return;
    }
    if write_line(writer, "clearservers").await.is_err() {
        return;
    }
    for record in &snapshot {
        if write_line(writer, &record.addserver_line()).await.is_err() {
            return;
        }
    }
}

async fn run_server_session<R, W>(
    reader: &mut BufReader<R>,
    writer: &mut W,
    peer_ip: Ipv4Addr,
    registry: &Registry,
    auth_store: &AuthStore,
    first_command: Command,
) where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut identity: Option<Identity> = None;
    let mut pending = PendingAuthTable::new();
    let mut command = Some(first_command);

    loop {
        let command = match command.take() {
            Some(command) => command,
            None => match read_decoded_line(reader).await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(command) => command,
                    Err(err) => {
                        write_error(writer, &err).await;
                        break;
                    }
                },
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(peer = %peer_ip, error = %err, "read failed in server session");
                    break;
                }
            },
        };

        match command {
            Command::Update => {
                // A server connection is allowed to ask for the list too;
                // it doesn't change its registration state.
                handle_update(writer, registry).await;
            }
            Command::Server {
                port,
                serverip,
                version: _,
                info: _,
                extra: _,
                branch,
            } => {
                match registry
                    .register(identity, peer_ip, &serverip, port, branch)
                    .await
                {
                    Ok(Some(record)) => {
                        identity = Some(record.identity());
                        let reply = format!(
                            r#"echo "Successfully pinged ({}:{}), server is now listed""#,
                            record.ip, record.port
                        );
                        if write_line(writer, &reply).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let reply = r#"echo "Error: Pinging failed, server will not be listed""#;
                        if write_line(writer, reply).await.is_err() {
                            break;
                        }
                    }
                    Err(RegisterError::ImmutableIp) => {
                        let reply = r#"echo "Error: Pinging failed, server will not be listed""#;
                        if write_line(writer, reply).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Command::ReqAuth { reqid, user, userip: _ } => {
                match auth_store.generate_challenge(&user) {
                    Ok(challenge) => {
                        let reply = format!("chalauth {reqid} {}", challenge.challenge_hex);
                        pending.insert(reqid, challenge);
                        if write_line(writer, &reply).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        let reply = format!("failauth {reqid}");
                        if write_line(writer, &reply).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Command::ConfAuth { reqid, reply } => {
                let outcome = match pending.take(reqid) {
                    Some(request) => auth_store
                        .validate_reply(&reply, &request)
                        .ok()
                        .filter(|ok| *ok)
                        .map(|_| request),
                    None => None,
                };

                match outcome {
                    Some(request) => {
                        let flags = auth_store
                            .get_user_flags(&request.user_name)
                            .unwrap_or_default();
                        let line =
                            format!(r#"succauth {reqid} "{}" "{}""#, request.user_name, flags);
                        if write_line(writer, &line).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let line = format!("failauth {reqid}");
                        if write_line(writer, &line).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    if let Some(identity) = identity {
        registry.remove(identity).await;
    }
}
