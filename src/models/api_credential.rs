use serde::Deserialize;
use std::fmt;

/// API key pair used to authenticate private endpoints
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String, // Never logged
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Create API key preview (last 4 characters)
    pub fn create_preview(api_key: &str) -> String {
        let chars: Vec<char> = api_key.chars().collect();
        let len = chars.len();
        if len <= 4 {
            "*".repeat(len)
        } else {
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}...{}", "*".repeat(4), tail)
        }
    }

    pub fn api_key_preview(&self) -> String {
        Self::create_preview(&self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key_preview())
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
