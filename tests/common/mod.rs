//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use watchman_proxy::config::env::{ENV_DESTINATION_PORT, ENV_LOOKUP_DIR};
use watchman_proxy::{ConfigResolver, GatewayServer, HtpasswdStore, Shutdown};

/// alice/secret ({SHA}) and bob/secret (apr1).
pub const PASSWD: &str = "alice:{SHA}5en6G6MezRroT3XKqkdPOmY/BfQ=\n\
                          bob:$apr1$saltsalt$LrttParrLPdxvgutaSXWJ0\n";

/// Headers the echo upstream reflects back as `x-echo-<name>`.
const ECHOED_HEADERS: [&str; 3] = ["host", "authorization", "x-custom"];

/// Start an upstream that reflects the request it received.
///
/// - `/status/<code>` answers with that status
/// - `/slow` answers after one second
/// - anything else echoes method, URI and selected headers in `x-echo-*`
///   response headers, and the request body as the response body
pub async fn start_echo_upstream(hits: Arc<AtomicUsize>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move |req: Request<Body>| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            echo(req).await
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(req: Request<Body>) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    if let Some(code) = path.strip_prefix("/status/") {
        let status = code
            .parse::<u16>()
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::BAD_REQUEST);
        return (status, [("x-upstream", "status")], format!("status {}", code)).into_response();
    }

    if path == "/slow" {
        tokio::time::sleep(Duration::from_secs(1)).await;
        return "slow".into_response();
    }

    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-echo-method", HeaderValue::from_str(parts.method.as_str()).unwrap());
    headers.insert("x-echo-uri", HeaderValue::from_str(&parts.uri.to_string()).unwrap());
    for name in ECHOED_HEADERS {
        if let Some(value) = parts.headers.get(name) {
            headers.insert(
                header::HeaderName::from_bytes(format!("x-echo-{}", name).as_bytes()).unwrap(),
                value.clone(),
            );
        }
    }

    (StatusCode::OK, headers, body).into_response()
}

/// Start a raw TCP upstream that writes `raw` verbatim and closes.
pub async fn start_raw_upstream(raw: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
                        let _ = socket.write_all(raw.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address with nothing listening on it.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A running gateway. Shuts down on drop.
pub struct Gateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    _dir: TempDir,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Resolve a config pointing at `upstream` and serve it on an ephemeral port.
pub async fn start_gateway(upstream: SocketAddr, passwd: &str) -> Gateway {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("watchman.passwd"), passwd).unwrap();

    let mut env = HashMap::new();
    env.insert(ENV_LOOKUP_DIR.to_string(), dir.path().display().to_string());
    env.insert(ENV_DESTINATION_PORT.to_string(), upstream.port().to_string());

    let resolver = ConfigResolver::with_env(env);
    let config = resolver.resolve(&resolver.config_path(None)).unwrap();
    let store = Arc::new(HtpasswdStore::open(config.credential_file()).unwrap());
    let server = GatewayServer::new(config, store).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Gateway {
        addr,
        shutdown,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
