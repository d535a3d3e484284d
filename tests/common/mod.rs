//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proxy_front::config::{ListenerConfig, MountConfig, ServerConfig};
use proxy_front::http::DrainOutcome;
use proxy_front::lifecycle::{Lifecycle, LifecycleState, Shutdown};
use proxy_front::tunnel::{TunnelBackend, TunnelError, TunnelHandoff};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const INDEX_HTML: &str = "<!doctype html><title>front</title>";
pub const BUNDLE_JS: &str = "self.__uv$config = {};";
pub const SECRET: &str = "outside the mounts";

/// Asset layout mirroring the real deployment:
///
/// ```text
/// <tmp>/secret.txt
/// <tmp>/public/index.html
/// <tmp>/uv/uv.bundle.js
/// ```
pub struct AssetTree {
    pub dir: TempDir,
}

impl AssetTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), SECRET).unwrap();
        std::fs::create_dir(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/index.html"), INDEX_HTML).unwrap();
        std::fs::create_dir(dir.path().join("uv")).unwrap();
        std::fs::write(dir.path().join("uv/uv.bundle.js"), BUNDLE_JS).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file of `len` bytes under `public/`.
    pub fn write_large(&self, name: &str, len: usize) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(self.path().join("public").join(name), data).unwrap();
    }

    /// Server config on an ephemeral loopback port serving this tree.
    pub fn config(&self) -> ServerConfig {
        let root = |sub: &str| self.path().join(sub).to_string_lossy().into_owned();
        ServerConfig {
            listener: ListenerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                max_connections: 64,
            },
            mounts: vec![MountConfig::new("/", root("public")), MountConfig::new("/uv/", root("uv"))],
            ..ServerConfig::default()
        }
    }
}

/// Tunnel backend stub that reports every handoff on a channel.
pub struct RecordingBackend {
    tx: mpsc::UnboundedSender<TunnelHandoff>,
}

impl RecordingBackend {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TunnelHandoff>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl TunnelBackend for RecordingBackend {
    async fn route_request(&self, handoff: TunnelHandoff) -> Result<(), TunnelError> {
        self.tx.send(handoff).map_err(|_| TunnelError::Unavailable)
    }
}

/// A server running on a background task.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<LifecycleState>,
    pub handle: JoinHandle<DrainOutcome>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request shutdown and wait for the server to close.
    pub async fn stop(self) -> DrainOutcome {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .unwrap()
            .unwrap()
    }
}

pub async fn start_server(config: ServerConfig, backend: Arc<dyn TunnelBackend>) -> TestServer {
    let listening = Lifecycle::new(config, backend).unwrap().bind().await.unwrap();
    let addr = listening.local_addr();
    let state = listening.state();
    let shutdown = Shutdown::new();

    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { listening.run_until(&shutdown).await }
    });

    TestServer {
        addr,
        shutdown,
        state,
        handle,
    }
}

/// Send raw bytes and read until the server closes the connection.
///
/// A reset counts as a close; whatever arrived before it is returned.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), async {
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    })
    .await;
    assert!(read.is_ok(), "server did not close the connection");
    buf
}

pub fn upgrade_request(path: &str) -> Vec<u8> {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: localhost\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         \r\n",
        path
    )
    .into_bytes()
}

pub fn assert_policy_headers(headers: &reqwest::header::HeaderMap) {
    assert_eq!(
        headers["content-security-policy"],
        "frame-ancestors https://sites.google.com;"
    );
    assert_eq!(headers["x-frame-options"], "ALLOW-FROM https://sites.google.com");
    assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
    assert_eq!(headers["cross-origin-embedder-policy"], "require-corp");
}
