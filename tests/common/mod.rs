// Test helpers shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_native_tls::TlsAcceptor;

use compose_lab::config::{StaticEnv, DB_HOST, DB_NAME, DB_PASS, DB_PORT, DB_USER};

const SSL_REQUEST_CODE: u32 = 80877103;

const SELF_SIGNED_CERT: &[u8] = include_bytes!("../fixtures/self_signed.crt");
const SELF_SIGNED_KEY: &[u8] = include_bytes!("../fixtures/self_signed.key");

/// How the fake server answers a startup message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    AcceptAll,
    RejectPassword,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicUsize,
    encrypted: AtomicUsize,
    terminated: AtomicUsize,
}

/// Minimal PostgreSQL backend: answers the SSLRequest (declining, or upgrading
/// with a self-signed certificate), completes the startup handshake (or
/// rejects it) and counts sessions that end with a Terminate message.
pub struct FakePostgres {
    pub addr: SocketAddr,
    counters: Arc<Counters>,
}

impl FakePostgres {
    /// Server with TLS off, like the stock postgres image.
    pub async fn start(behavior: Behavior) -> Self {
        Self::spawn(behavior, None).await
    }

    /// Server with `ssl=on` and a self-signed certificate for another host name.
    pub async fn start_with_tls(behavior: Behavior) -> Self {
        Self::spawn(behavior, Some(self_signed_acceptor())).await
    }

    async fn spawn(behavior: Behavior, tls: Option<TlsAcceptor>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counters = Arc::new(Counters::default());

        let shared = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                shared.accepted.fetch_add(1, Ordering::SeqCst);
                let counters = Arc::clone(&shared);
                let tls = tls.clone();
                tokio::spawn(async move {
                    let _ = serve_session(stream, behavior, tls, counters).await;
                });
            }
        });

        FakePostgres { addr, counters }
    }

    pub fn accepted(&self) -> usize {
        self.counters.accepted.load(Ordering::SeqCst)
    }

    /// Sessions that completed a TLS handshake.
    pub fn encrypted(&self) -> usize {
        self.counters.encrypted.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.counters.terminated.load(Ordering::SeqCst)
    }

    /// Waits until `count` sessions have sent Terminate, or gives up after 5s.
    pub async fn wait_for_terminated(&self, count: usize) -> usize {
        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            while self.terminated() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        self.terminated()
    }

    pub fn env(&self) -> StaticEnv {
        lab_env(&self.addr.ip().to_string(), self.addr.port())
    }
}

pub fn lab_env(host: &str, port: u16) -> StaticEnv {
    StaticEnv::new()
        .with(DB_HOST, host)
        .with(DB_PORT, port.to_string())
        .with(DB_NAME, "labdb")
        .with(DB_USER, "lab")
        .with(DB_PASS, "secret")
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn self_signed_acceptor() -> TlsAcceptor {
    let identity = native_tls::Identity::from_pkcs8(SELF_SIGNED_CERT, SELF_SIGNED_KEY).unwrap();
    TlsAcceptor::from(native_tls::TlsAcceptor::new(identity).unwrap())
}

async fn read_packet<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<Vec<u8>> {
    let len = stream.read_u32().await? as usize;
    let mut body = vec![0u8; len.saturating_sub(4)];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

fn is_ssl_request(packet: &[u8]) -> bool {
    packet.len() == 4 && u32::from_be_bytes([packet[0], packet[1], packet[2], packet[3]]) == SSL_REQUEST_CODE
}

async fn serve_session(
    mut stream: TcpStream,
    behavior: Behavior,
    tls: Option<TlsAcceptor>,
    counters: Arc<Counters>,
) -> std::io::Result<()> {
    // SSLRequest (optional) then StartupMessage; neither carries a type byte.
    let packet = read_packet(&mut stream).await?;
    if !is_ssl_request(&packet) {
        return answer_startup(stream, behavior, counters).await;
    }

    match tls {
        Some(acceptor) => {
            stream.write_all(b"S").await?;
            let mut stream = acceptor
                .accept(stream)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            counters.encrypted.fetch_add(1, Ordering::SeqCst);
            read_packet(&mut stream).await?;
            answer_startup(stream, behavior, counters).await
        }
        None => {
            stream.write_all(b"N").await?;
            read_packet(&mut stream).await?;
            answer_startup(stream, behavior, counters).await
        }
    }
}

/// Replies to an already consumed StartupMessage and drains the session.
async fn answer_startup<S: AsyncRead + AsyncWrite + Unpin>(
    mut stream: S,
    behavior: Behavior,
    counters: Arc<Counters>,
) -> std::io::Result<()> {
    match behavior {
        Behavior::AcceptAll => {
            // AuthenticationOk
            stream.write_all(&[b'R', 0, 0, 0, 8, 0, 0, 0, 0]).await?;
            // ReadyForQuery, idle
            stream.write_all(&[b'Z', 0, 0, 0, 5, b'I']).await?;
            stream.flush().await?;
        }
        Behavior::RejectPassword => {
            let mut fields = Vec::new();
            for (code, value) in [
                (b'S', "FATAL"),
                (b'V', "FATAL"),
                (b'C', "28P01"),
                (b'M', "password authentication failed for user \"lab\""),
            ] {
                fields.push(code);
                fields.extend_from_slice(value.as_bytes());
                fields.push(0);
            }
            fields.push(0);

            let mut message = vec![b'E'];
            message.extend_from_slice(&((fields.len() + 4) as u32).to_be_bytes());
            message.extend_from_slice(&fields);
            stream.write_all(&message).await?;
            stream.flush().await?;
            return Ok(());
        }
    }

    // Frontend messages from here on are tagged.
    loop {
        let tag = match stream.read_u8().await {
            Ok(tag) => tag,
            Err(_) => return Ok(()),
        };
        read_packet(&mut stream).await?;
        if tag == b'X' {
            counters.terminated.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
    }
}
