#![allow(dead_code)]

use async_trait::async_trait;
use binance_core_client::{ClientSettings, Prober, ProxyDescriptor, ProxyKind};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const BASE_URL: &str = "http://api.test";
pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "test-api-secret";

/// A request as seen by the fake proxy
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Absolute-form target, e.g. `http://api.test/api/v3/time`
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        let without_scheme = self.target.trim_start_matches(BASE_URL);
        without_scheme.split('?').next().unwrap_or("")
    }

    pub fn query(&self) -> &str {
        self.target.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP proxy that answers every forwarded request itself with scripted responses
///
/// `CONNECT` requests (liveness probes) are accepted with 200 and counted.
pub struct FakeExchange {
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    probes: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FakeExchange {
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let probes = Arc::new(AtomicUsize::new(0));
        let mut queue: VecDeque<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();

        let recorded = Arc::clone(&requests);
        let probe_count = Arc::clone(&probes);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let mut reader = BufReader::new(socket);

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                    continue;
                }
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let target = parts.next().unwrap_or_default().to_string();

                let mut headers = Vec::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                        break;
                    }
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        let value = value.trim().to_string();
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.parse().unwrap_or(0);
                        }
                        headers.push((name.trim().to_string(), value));
                    }
                }
                if content_length > 0 {
                    let mut body = vec![0u8; content_length];
                    let _ = reader.read_exact(&mut body).await;
                }

                let socket = reader.get_mut();
                if method == "CONNECT" {
                    probe_count.fetch_add(1, Ordering::SeqCst);
                    let _ = socket
                        .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                        .await;
                    continue;
                }

                recorded.lock().unwrap().push(RecordedRequest {
                    method,
                    target,
                    headers,
                });

                let (status, body) = queue
                    .pop_front()
                    .unwrap_or((500, r#"{"code":-1000,"msg":"no scripted response"}"#.to_string()));
                let response = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            port,
            requests,
            probes,
            handle,
        }
    }

    pub fn proxy(&self) -> ProxyDescriptor {
        ProxyDescriptor::new(ProxyKind::Http, "127.0.0.1", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Drop for FakeExchange {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A local port with nothing listening on it
pub async fn dead_proxy() -> ProxyDescriptor {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ProxyDescriptor::new(ProxyKind::Http, "127.0.0.1", port)
}

/// Settings pointing both markets at the fake exchange host
pub fn settings(proxies: Vec<ProxyDescriptor>) -> ClientSettings {
    let mut settings = ClientSettings::new(API_KEY, API_SECRET, proxies);
    settings.spot_base_url = Some(BASE_URL.to_string());
    settings.futures_base_url = Some(BASE_URL.to_string());
    settings.request_timeout_secs = 5;
    settings.probe.timeout_ms = 1_000;
    settings
}

/// Prober that reports every proxy alive and counts calls
#[derive(Default)]
pub struct AlwaysAlive {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Prober for AlwaysAlive {
    async fn probe(&self, _proxy: &ProxyDescriptor) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        true
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
