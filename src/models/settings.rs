use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::api_credential::Credentials;
use super::proxy::ProxyDescriptor;
use crate::api::error::ApiError;

pub const SPOT_BASE_URL: &str = "https://api.binance.com";
pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
pub const SPOT_TESTNET_BASE_URL: &str = "https://testnet.binance.vision";
pub const FUTURES_TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";

/// Everything one client instance needs; injected at construction
#[derive(Clone, Deserialize)]
pub struct ClientSettings {
    pub api_key: String,
    pub api_secret: String,
    pub proxies: Vec<ProxyDescriptor>,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub spot_base_url: Option<String>,
    #[serde(default)]
    pub futures_base_url: Option<String>,
    /// Server-side tolerance for timestamp drift, sent as `recvWindow`
    #[serde(default)]
    pub recv_window_ms: Option<u64>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub probe: ProbeSettings,
}

/// Liveness probe target and timeout
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    #[serde(default = "default_probe_host")]
    pub target_host: String,
    #[serde(default = "default_probe_port")]
    pub target_port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_host() -> String {
    "8.8.8.8".to_string()
}

fn default_probe_port() -> u16 {
    53
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            target_host: default_probe_host(),
            target_port: default_probe_port(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ClientSettings {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>, proxies: Vec<ProxyDescriptor>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            proxies,
            testnet: false,
            spot_base_url: None,
            futures_base_url: None,
            recv_window_ms: None,
            request_timeout_secs: default_request_timeout_secs(),
            probe: ProbeSettings::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ApiError> {
        let settings: ClientSettings = serde_json::from_str(json)
            .map_err(|e| ApiError::ConfigError(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ApiError::ConfigError(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(ApiError::ConfigError("API key and secret are required".to_string()));
        }
        if self.proxies.is_empty() {
            return Err(ApiError::ConfigError("At least one proxy is required".to_string()));
        }
        for proxy in &self.proxies {
            proxy.validate()?;
        }
        if self.probe.timeout_ms == 0 {
            return Err(ApiError::ConfigError("Probe timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.clone(), self.api_secret.clone())
    }

    pub fn spot_base_url(&self) -> String {
        match self.spot_base_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None if self.testnet => SPOT_TESTNET_BASE_URL.to_string(),
            None => SPOT_BASE_URL.to_string(),
        }
    }

    pub fn futures_base_url(&self) -> String {
        match self.futures_base_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None if self.testnet => FUTURES_TESTNET_BASE_URL.to_string(),
            None => FUTURES_BASE_URL.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &Credentials::create_preview(&self.api_key))
            .field("proxies", &self.proxies)
            .field("testnet", &self.testnet)
            .field("spot_base_url", &self.spot_base_url())
            .field("futures_base_url", &self.futures_base_url())
            .field("recv_window_ms", &self.recv_window_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("probe", &self.probe)
            .finish()
    }
}
