//! HMAC-SHA256 request signing for Binance private endpoints.
//!
//! The signature covers the url-encoded query string in the exact order the
//! parameters were pushed. The same string is sent on the wire, so the server
//! recomputes the digest over identical bytes.

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;

use super::error::ApiError;
use crate::models::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";
pub const SIGNATURE_PARAM: &str = "signature";

/// Ordered request parameters; insertion order is the signing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    pub fn push_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Url-encode in insertion order
    pub fn to_query_string(&self) -> Result<String, ApiError> {
        Ok(serde_urlencoded::to_string(&self.pairs)?)
    }
}

/// Query string, its signature and the auth header for one private call
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub query_string: String,
    pub signature: String,
    pub headers: HeaderMap,
}

impl SignedRequest {
    /// Exact bytes to send: the signed query with the signature appended last
    pub fn full_query(&self) -> String {
        if self.query_string.is_empty() {
            format!("{}={}", SIGNATURE_PARAM, self.signature)
        } else {
            format!("{}&{}={}", self.query_string, SIGNATURE_PARAM, self.signature)
        }
    }
}

/// Current Unix time in milliseconds
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn hmac_sha256_hex(secret_key: &str, payload: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| ApiError::SigningPrecondition(format!("Unusable secret key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign `params` with `secret_key`, returning the lowercase hex HMAC-SHA256
///
/// `params` must not already carry a `signature` entry; the caller appends it.
pub fn sign(params: &QueryParams, secret_key: &str) -> Result<String, ApiError> {
    if params.contains(SIGNATURE_PARAM) {
        return Err(ApiError::SigningPrecondition(
            "params already contain a signature".to_string(),
        ));
    }

    let query_string = params.to_query_string()?;
    hmac_sha256_hex(secret_key, &query_string)
}

/// Build the API key header (`X-MBX-APIKEY`)
pub fn auth_header(api_key: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(api_key)
            .map_err(|e| ApiError::AuthenticationError(format!("Invalid API key: {}", e)))?,
    );
    Ok(headers)
}

/// Append `recvWindow`/`timestamp`, sign and build headers
///
/// The timestamp is taken here, right before signing, to keep the gap to
/// transmission small.
pub fn sign_request(
    params: QueryParams,
    credentials: &Credentials,
    recv_window_ms: Option<u64>,
) -> Result<SignedRequest, ApiError> {
    let mut params = params;
    if let Some(window) = recv_window_ms {
        if !params.contains("recvWindow") {
            params = params.push("recvWindow", window);
        }
    }
    if !params.contains("timestamp") {
        params = params.push("timestamp", timestamp_millis());
    }

    let signature = sign(&params, &credentials.api_secret)?;
    let query_string = params.to_query_string()?;
    let headers = auth_header(&credentials.api_key)?;

    Ok(SignedRequest {
        query_string,
        signature,
        headers,
    })
}
