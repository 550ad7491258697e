use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

use crate::api::error::ApiError;

/// Proxy protocol spoken between us and the proxy server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Socks5,
    Http,
    Https,
}

impl ProxyKind {
    /// URL scheme handed to the HTTP client.
    ///
    /// SOCKS5 uses `socks5h` so hostnames are resolved by the proxy, not locally.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyKind::Socks5 => "socks5h",
            ProxyKind::Http => "http",
            ProxyKind::Https => "https",
        }
    }
}

/// A single candidate proxy, as read from configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    #[serde(default = "default_kind")]
    pub kind: ProxyKind,
    #[serde(alias = "address")]
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_kind() -> ProxyKind {
    ProxyKind::Socks5
}

impl ProxyDescriptor {
    pub fn new(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Reject descriptors that can never work
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.host.trim().is_empty() {
            return Err(ApiError::ConfigError("Proxy host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ApiError::ConfigError(format!(
                "Proxy {} has port 0 (expected 1-65535)",
                self.host
            )));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ApiError::ConfigError(format!(
                "Proxy {} has a password but no username",
                self.endpoint()
            )));
        }
        // RFC 1929 has no username-only form
        if self.kind == ProxyKind::Socks5 && self.username.is_some() && self.password.is_none() {
            return Err(ApiError::ConfigError(format!(
                "SOCKS5 proxy {} has a username but no password",
                self.endpoint()
            )));
        }
        self.base_url().map(|_| ())
    }

    /// `host:port` of the proxy server itself, IPv6 hosts in brackets
    pub fn endpoint(&self) -> String {
        match self.host.parse::<Ipv6Addr>() {
            Ok(ip) => format!("[{}]:{}", ip, self.port),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }

    fn base_url(&self) -> Result<Url, ApiError> {
        Url::parse(&format!("{}://{}", self.kind.scheme(), self.endpoint()))
            .map_err(|e| ApiError::ConfigError(format!("Invalid proxy {}: {}", self.endpoint(), e)))
    }

    /// Full proxy URL with credentials embedded (percent-encoded)
    pub fn proxy_url(&self) -> Result<Url, ApiError> {
        self.validate()?;

        let mut url = self.base_url()?;

        if let Some(ref username) = self.username {
            url.set_username(username)
                .map_err(|_| ApiError::ConfigError(format!("Cannot embed username for {}", self.endpoint())))?;
            url.set_password(self.password.as_deref())
                .map_err(|_| ApiError::ConfigError(format!("Cannot embed password for {}", self.endpoint())))?;
        }

        Ok(url)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind.scheme(), self.endpoint())
    }
}
