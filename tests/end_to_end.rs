//! End-to-end scenarios driven against a real `Supervisor` bound to an
//! OS-assigned port, using raw `TcpStream`s the way a game server or client
//! would actually talk to the master.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use cube2_master::auth::AuthStore;
use cube2_master::codec::cube2;
use cube2_master::net::{PingError, Pinger};
use cube2_master::protocol::handle_connection;
use cube2_master::registry::Registry;

/// A pinger that always succeeds, returning a fixed info-reply datagram so
/// every registration attempt in these tests lists successfully.
struct AlwaysOk {
    reply: Vec<u8>,
}

#[async_trait]
impl Pinger for AlwaysOk {
    async fn ping(&self, _ip: Ipv4Addr, _port: u16) -> Result<Vec<u8>, PingError> {
        Ok(self.reply.clone())
    }
}

struct AlwaysTimeout;

#[async_trait]
impl Pinger for AlwaysTimeout {
    async fn ping(&self, _ip: Ipv4Addr, _port: u16) -> Result<Vec<u8>, PingError> {
        Err(PingError::Timeout(5))
    }
}

fn sample_info_reply() -> Vec<u8> {
    let mut v = vec![0x81, 0xEC, 0x04, 0x01, 0x00, 0x00, 0x00];
    v.extend_from_slice(b"dropzone\x00");
    v.extend_from_slice(b"Einherjer Europe [linuxiuvat.de]\x00");
    v
}

/// Bind a listener on an ephemeral port and spawn one `handle_connection`
/// task per accepted connection against the given registry/auth store, the
/// same wiring `Supervisor::start_server` does internally.
async fn spawn_test_master(
    registry: Arc<Registry>,
    auth_store: Arc<AuthStore>,
) -> std::net::SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, peer)) = listener.accept().await else {
                return;
            };
            let std::net::IpAddr::V4(peer_ip) = peer.ip() else {
                continue;
            };
            let registry = Arc::clone(&registry);
            let auth_store = Arc::clone(&auth_store);
            tokio::spawn(async move {
                handle_connection(stream, peer_ip, registry, auth_store).await;
            });
        }
    });

    addr
}

async fn send_line<W>(writer: &mut W, line: &str)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut encoded = cube2::encode(line);
    encoded.push(b'\n');
    writer.write_all(&encoded).await.unwrap();
}

async fn read_line(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> Option<String> {
    let mut raw = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(2), reader.read_until(b'\n', &mut raw))
        .await
        .expect("timed out waiting for a reply line")
        .unwrap();
    if n == 0 {
        return None;
    }
    if raw.last() == Some(&b'\n') {
        raw.pop();
    }
    Some(cube2::decode(&raw))
}

#[tokio::test]
async fn empty_update_lists_nothing() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(registry, auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, "update").await;

    let (read_half, mut write_half) = stream.into_split();
    write_half.shutdown().await.unwrap();
    let mut reader = BufReader::new(read_half);

    assert_eq!(read_line(&mut reader).await.as_deref(), Some("setversion 160 230"));
    assert_eq!(read_line(&mut reader).await.as_deref(), Some("clearservers"));
    assert_eq!(read_line(&mut reader).await, None);
}

#[tokio::test]
async fn registration_with_unreachable_info_port_is_rejected() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysTimeout)));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(Arc::clone(&registry), auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, r#"server 28800 * 260 "unreachable" 0 "master""#).await;

    let (read_half, _write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let reply = read_line(&mut reader).await.expect("a reply line");
    assert!(reply.contains("Pinging failed"));

    assert!(registry.snapshot().await.is_empty());
}

#[tokio::test]
async fn registration_then_update_lists_the_server() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(Arc::clone(&registry), auth_store).await;

    let mut registering = TcpStream::connect(addr).await.unwrap();
    send_line(&mut registering, r#"server 28800 * 260 "x" 0 "master""#).await;
    let (registering_read, _registering_write) = registering.into_split();
    let mut registering_reader = BufReader::new(registering_read);
    let reply = read_line(&mut registering_reader)
        .await
        .expect("registration reply");
    assert!(reply.contains("Successfully pinged"));

    let mut querying = TcpStream::connect(addr).await.unwrap();
    send_line(&mut querying, "update").await;
    let (read_half, mut write_half) = querying.into_split();
    write_half.shutdown().await.unwrap();
    let mut reader = BufReader::new(read_half);

    assert_eq!(read_line(&mut reader).await.as_deref(), Some("setversion 160 230"));
    assert_eq!(read_line(&mut reader).await.as_deref(), Some("clearservers"));
    let addserver_line = read_line(&mut reader).await.expect("addserver line");
    assert!(addserver_line.starts_with("addserver 127.0.0.1 28800 10"));
    assert!(addserver_line.contains("Einherjer Europe [linuxiuvat.de]"));
}

#[tokio::test]
async fn auth_happy_path_succeeds() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));

    let pubkey_hex = hex::encode(b"player-public-key");
    let mut users = HashMap::new();
    users.insert("player".to_string(), (pubkey_hex.clone(), "a".to_string()));
    let auth_store = Arc::new(AuthStore::from_map(users));

    let addr = spawn_test_master(registry, auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, "reqauth 1 player 127.0.0.1").await;

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let chalauth = read_line(&mut reader).await.expect("chalauth reply");
    let mut parts = chalauth.split_whitespace();
    assert_eq!(parts.next(), Some("chalauth"));
    assert_eq!(parts.next(), Some("1"));
    let challenge_hex = parts.next().expect("challenge hex").to_string();

    let expected =
        cube2_master::auth::crypto::expected_answer_for(&pubkey_hex, &challenge_hex).unwrap();

    send_line(&mut write_half, &format!("confauth 1 {expected}")).await;
    let succauth = read_line(&mut reader).await.expect("succauth reply");
    assert!(succauth.starts_with(r#"succauth 1 "player" "a""#));
}

#[tokio::test]
async fn auth_unknown_user_fails_immediately() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(registry, auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, "reqauth 7 ghost 127.0.0.1").await;

    let (read_half, _write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let reply = read_line(&mut reader).await.expect("failauth reply");
    assert_eq!(reply, "failauth 7");
}

#[tokio::test]
async fn private_ip_override_is_immutable_once_assigned() {
    // Loopback test sockets can't exercise the live-network path of this rule
    // (the peer address a listener on 127.0.0.1 sees is never an RFC-1918
    // address), so this drives the registry directly the way a `server`
    // command from an RFC-1918 peer would.
    let registry = Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    }));
    let peer = Ipv4Addr::new(10, 0, 0, 5);

    let first = registry
        .register(None, peer, "198.51.100.7", 28800, "master".to_string())
        .await
        .unwrap()
        .expect("first registration succeeds");
    assert_eq!(first.ip, Ipv4Addr::new(198, 51, 100, 7));

    let identity = first.identity();
    let second = registry
        .register(Some(identity), peer, "198.51.100.9", 28800, "master".to_string())
        .await;
    assert!(matches!(second, Err(cube2_master::registry::RegisterError::ImmutableIp)));

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].ip, Ipv4Addr::new(198, 51, 100, 7));
}

#[tokio::test]
async fn reregistering_on_a_new_port_is_rejected() {
    // Over a real loopback connection the peer address is fixed, so the only
    // way to observe the immutable-identity rule end to end is to vary the
    // port instead of the IP.
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(Arc::clone(&registry), auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, r#"server 28800 * 260 "x" 0 "master""#).await;

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let first_reply = read_line(&mut reader).await.expect("first registration reply");
    assert!(first_reply.contains("Successfully pinged"));

    send_line(&mut write_half, r#"server 28801 * 260 "x" 0 "master""#).await;
    let second_reply = read_line(&mut reader).await.expect("second registration reply");
    assert!(second_reply.contains("Pinging failed"));

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].port, 28800);
}

#[tokio::test]
async fn disconnect_removes_the_server_from_the_registry() {
    let registry = Arc::new(Registry::new(Arc::new(AlwaysOk {
        reply: sample_info_reply(),
    })));
    let auth_store = Arc::new(AuthStore::empty());
    let addr = spawn_test_master(Arc::clone(&registry), auth_store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_line(&mut stream, r#"server 28800 * 260 "x" 0 "master""#).await;
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    read_line(&mut reader).await.expect("registration reply");
    assert_eq!(registry.snapshot().await.len(), 1);

    drop(reader);
    drop(write_half);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(registry.snapshot().await.is_empty());
}
