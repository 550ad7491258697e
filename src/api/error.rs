use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Invalid API response: {0}")]
    ParseError(String),

    #[error("Exchange API error: {code} - {message}")]
    ExchangeError { code: i64, message: String },

    #[error("Exchange unreachable via any configured proxy ({tried} tried)")]
    NoWorkingProxy { tried: usize },

    #[error("Signing precondition violated: {0}")]
    SigningPrecondition(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ApiError {
    /// True when the remote side rejected our key, signature or timestamp.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ApiError::AuthenticationError(_))
    }

    /// True for failures where retrying through another proxy may help.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::HttpError(_) | ApiError::NoWorkingProxy { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ParseError(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for ApiError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        ApiError::EncodingError(err.to_string())
    }
}
