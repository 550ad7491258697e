use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

use crate::models::{ProbeSettings, ProxyDescriptor, ProxyKind};

/// Liveness check for a candidate proxy
///
/// Implementations must never fail loudly: any error counts as "dead".
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, proxy: &ProxyDescriptor) -> bool;
}

/// Opens a tunnel through the proxy to a well-known public endpoint
pub struct TcpProber {
    target_host: String,
    target_port: u16,
    timeout: Duration,
}

impl TcpProber {
    pub fn new(target_host: impl Into<String>, target_port: u16, timeout: Duration) -> Self {
        Self {
            target_host: target_host.into(),
            target_port,
            timeout,
        }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self::new(settings.target_host.clone(), settings.target_port, settings.timeout())
    }

    async fn try_probe(&self, proxy: &ProxyDescriptor) -> io::Result<()> {
        let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;

        match proxy.kind {
            ProxyKind::Socks5 => self.socks5_connect(stream, proxy).await,
            ProxyKind::Http => self.http_connect(&mut stream, proxy).await,
            // TLS to the proxy is negotiated by the HTTP client; reaching it is enough here
            ProxyKind::Https => Ok(()),
        }
    }

    async fn socks5_connect(&self, stream: TcpStream, proxy: &ProxyDescriptor) -> io::Result<()> {
        let target = (self.target_host.as_str(), self.target_port);

        let result = match (proxy.username.as_deref(), proxy.password.as_deref()) {
            (Some(user), Some(pass)) => {
                Socks5Stream::connect_with_password_and_socket(stream, target, user, pass)
                    .await
                    .map(drop)
            }
            _ => Socks5Stream::connect_with_socket(stream, target).await.map(drop),
        };

        result.map_err(io::Error::other)
    }

    async fn http_connect(&self, stream: &mut TcpStream, proxy: &ProxyDescriptor) -> io::Result<()> {
        let authority = match self.target_host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.target_port),
            _ => format!("{}:{}", self.target_host, self.target_port),
        };

        let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
        if let Some(ref user) = proxy.username {
            let token = general_purpose::STANDARD.encode(format!(
                "{}:{}",
                user,
                proxy.password.as_deref().unwrap_or("")
            ));
            request.push_str(&format!("Proxy-Authorization: Basic {}\r\n", token));
        }
        request.push_str("\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut status_line = String::new();
        BufReader::new(stream).read_line(&mut status_line).await?;

        // "HTTP/1.1 200 Connection established"
        let code = status_line.split_whitespace().nth(1);
        if code != Some("200") {
            return Err(io::Error::other(format!(
                "CONNECT rejected: {}",
                status_line.trim_end()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, proxy: &ProxyDescriptor) -> bool {
        match tokio::time::timeout(self.timeout, self.try_probe(proxy)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::debug!("Proxy {} failed liveness probe: {}", proxy, e);
                false
            }
            Err(_) => {
                log::debug!("Proxy {} timed out after {:?}", proxy, self.timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const SOCKS_VERSION: u8 = 0x05;
    const SOCKS_NO_AUTH: u8 = 0x00;
    const SOCKS_USER_PASS: u8 = 0x02;

    async fn listen() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn prober() -> TcpProber {
        TcpProber::new("8.8.8.8", 53, Duration::from_secs(2))
    }

    /// Minimal SOCKS5 server: optional user/pass, answers CONNECT with `reply_code`
    async fn fake_socks5(listener: TcpListener, expect_auth: Option<(&'static str, &'static str)>, reply_code: u8) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut head = [0u8; 2];
        socket.read_exact(&mut head).await.unwrap();
        let mut methods = vec![0u8; head[1] as usize];
        socket.read_exact(&mut methods).await.unwrap();

        if let Some((user, pass)) = expect_auth {
            assert!(methods.contains(&SOCKS_USER_PASS));
            socket.write_all(&[SOCKS_VERSION, SOCKS_USER_PASS]).await.unwrap();

            let mut ver_len = [0u8; 2];
            socket.read_exact(&mut ver_len).await.unwrap();
            let mut got_user = vec![0u8; ver_len[1] as usize];
            socket.read_exact(&mut got_user).await.unwrap();
            let mut plen = [0u8; 1];
            socket.read_exact(&mut plen).await.unwrap();
            let mut got_pass = vec![0u8; plen[0] as usize];
            socket.read_exact(&mut got_pass).await.unwrap();

            let ok = got_user == user.as_bytes() && got_pass == pass.as_bytes();
            socket.write_all(&[0x01, if ok { 0x00 } else { 0x01 }]).await.unwrap();
            if !ok {
                return Vec::new();
            }
        } else {
            socket.write_all(&[SOCKS_VERSION, SOCKS_NO_AUTH]).await.unwrap();
        }

        // ver, cmd, rsv, atyp=1, 4 addr bytes, 2 port bytes
        let mut request = [0u8; 10];
        socket.read_exact(&mut request).await.unwrap();
        socket
            .write_all(&[SOCKS_VERSION, reply_code, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
            .await
            .unwrap();
        request.to_vec()
    }

    #[tokio::test]
    async fn test_socks5_probe_succeeds() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(fake_socks5(listener, None, 0x00));

        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port);
        assert!(prober().probe(&proxy).await);

        let request = server.await.unwrap();
        assert_eq!(request, vec![5, 1, 0, 1, 8, 8, 8, 8, 0, 53]);
    }

    #[tokio::test]
    async fn test_socks5_probe_with_credentials() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(fake_socks5(listener, Some(("alice", "pw")), 0x00));

        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port)
            .with_credentials("alice", "pw");
        assert!(prober().probe(&proxy).await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks5_wrong_credentials_fail() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(fake_socks5(listener, Some(("alice", "pw")), 0x00));

        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port)
            .with_credentials("alice", "wrong");
        assert!(!prober().probe(&proxy).await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks5_connect_refused_by_proxy() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(fake_socks5(listener, None, 0x05));

        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port);
        assert!(!prober().probe(&proxy).await);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_connect_probe() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut lines = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                lines.push(line.trim_end().to_string());
            }
            reader
                .get_mut()
                .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                .await
                .unwrap();
            lines
        });

        let proxy = ProxyDescriptor::new(ProxyKind::Http, "127.0.0.1", port)
            .with_credentials("bob", "secret");
        assert!(prober().probe(&proxy).await);

        let lines = server.await.unwrap();
        assert_eq!(lines[0], "CONNECT 8.8.8.8:53 HTTP/1.1");
        let expected = format!(
            "Proxy-Authorization: Basic {}",
            general_purpose::STANDARD.encode("bob:secret")
        );
        assert!(lines.contains(&expected));
    }

    #[tokio::test]
    async fn test_http_connect_rejected() {
        let (listener, port) = listen().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 512];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n")
                .await;
        });

        let proxy = ProxyDescriptor::new(ProxyKind::Http, "127.0.0.1", port);
        assert!(!prober().probe(&proxy).await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_false() {
        // Bind then drop to get a port nobody listens on
        let (listener, port) = listen().await;
        drop(listener);

        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port);
        assert!(!prober().probe(&proxy).await);
    }

    #[tokio::test]
    async fn test_silent_proxy_times_out() {
        let (listener, port) = listen().await;
        let server = tokio::spawn(async move {
            // Accept and never answer the greeting
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let prober = TcpProber::new("8.8.8.8", 53, Duration::from_millis(200));
        let proxy = ProxyDescriptor::new(ProxyKind::Socks5, "127.0.0.1", port);

        let start = std::time::Instant::now();
        assert!(!prober.probe(&proxy).await);
        assert!(start.elapsed() < Duration::from_secs(1));
        server.abort();
    }

    #[tokio::test]
    async fn test_https_proxy_reachability() {
        let (listener, port) = listen().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let proxy = ProxyDescriptor::new(ProxyKind::Https, "127.0.0.1", port);
        assert!(prober().probe(&proxy).await);
    }
}
