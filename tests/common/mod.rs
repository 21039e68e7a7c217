//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use render_extras::config::{BundleConfig, HttpHeaderRule};
use render_extras::http::HttpServer;
use render_extras::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A canned upstream response.
#[derive(Clone)]
pub struct Canned {
    pub status: &'static str,
    pub content_type: Option<&'static str>,
    pub body: String,
    /// Send the body with chunked transfer encoding.
    pub chunked: bool,
}

impl Canned {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: "200 OK",
            content_type: Some("text/html; charset=UTF-8"),
            body: body.into(),
            chunked: false,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    fn to_wire(&self) -> String {
        let mut out = format!("HTTP/1.1 {}\r\nConnection: close\r\n", self.status);
        if let Some(content_type) = self.content_type {
            out.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        if self.chunked {
            out.push_str("Transfer-Encoding: chunked\r\n\r\n");
            for chunk in self.body.as_bytes().chunks(8) {
                out.push_str(&format!("{:x}\r\n", chunk.len()));
                out.push_str(&String::from_utf8_lossy(chunk));
                out.push_str("\r\n");
            }
            out.push_str("0\r\n\r\n");
        } else {
            out.push_str(&format!("Content-Length: {}\r\n\r\n{}", self.body.len(), self.body));
        }
        out
    }
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_mock_upstream(response: Canned) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let wire = response.to_wire();
            tokio::spawn(async move {
                // Read the request head before answering
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(wire.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn rule(name: &str, pattern: Option<&str>, value: &str, replace: &str) -> HttpHeaderRule {
    let mut json = serde_json::json!({ "name": name, "value": value, "replace": replace });
    if let Some(pattern) = pattern {
        json["pattern"] = pattern.into();
    }
    serde_json::from_value(json).unwrap()
}

pub fn config_for(upstream: SocketAddr, rules: Vec<HttpHeaderRule>) -> BundleConfig {
    let mut config = BundleConfig::default();
    config.server.upstream = format!("http://{}", upstream);
    config.http_headers = rules;
    config
}

/// A proxy running on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<BundleConfig>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: BundleConfig) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningProxy {
        addr,
        shutdown,
        updates,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
