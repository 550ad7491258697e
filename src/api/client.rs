use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::ApiError;
use super::proxy::ProxyPool;
use super::signing::{sign_request, QueryParams};
use super::types::BinanceErrorBody;
use crate::models::Credentials;

/// Binance codes meaning the request itself failed authentication:
/// -1021 timestamp outside recvWindow, -1022 bad signature,
/// -2014 bad API key format, -2015 key rejected / IP not whitelisted
const AUTH_ERROR_CODES: [i64; 4] = [-1021, -1022, -2014, -2015];

/// Issues signed and public calls through the proxy pool
pub struct RestClient {
    credentials: Credentials,
    pool: Arc<ProxyPool>,
    recv_window_ms: Option<u64>,
}

impl RestClient {
    pub fn new(credentials: Credentials, pool: Arc<ProxyPool>, recv_window_ms: Option<u64>) -> Self {
        Self {
            credentials,
            pool,
            recv_window_ms,
        }
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// Signed call; `params` are sent in the order given, then `timestamp` and `signature`
    pub async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        params: QueryParams,
    ) -> Result<T, ApiError> {
        let session = self.pool.get_session().await?;

        // Sign after the pool is settled so the timestamp is fresh
        let signed = sign_request(params, &self.credentials, self.recv_window_ms)?;
        let url = format!("{}{}?{}", base_url, path, signed.full_query());

        log::debug!("{} {}{} via {}", method, base_url, path, session.proxy());

        let response = match session
            .client()
            .request(method, &url)
            .headers(signed.headers)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(e).await),
        };

        Self::handle_response(response).await
    }

    /// Unsigned GET
    pub async fn send_public<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
        params: QueryParams,
    ) -> Result<T, ApiError> {
        let session = self.pool.get_session().await?;

        let url = if params.is_empty() {
            format!("{}{}", base_url, path)
        } else {
            format!("{}{}?{}", base_url, path, params.to_query_string()?)
        };

        log::debug!("GET (public) {} via {}", url, session.proxy());

        let response = match session.client().get(&url).send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(e).await),
        };

        Self::handle_response(response).await
    }

    async fn transport_failure(&self, err: reqwest::Error) -> ApiError {
        // Could not even reach the exchange through the proxy
        if err.is_connect() {
            self.pool.invalidate().await;
        }
        ApiError::HttpError(err)
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &response_text));
        }

        // Endpoints like /ping answer with an empty body
        let body = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };

        serde_json::from_str(body).map_err(|e| {
            ApiError::ParseError(format!("Failed to parse response: {} - Body: {}", e, response_text))
        })
    }
}

/// Map a non-2xx response to a typed error
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<BinanceErrorBody> = serde_json::from_str(body).ok();

    match parsed {
        Some(err) if AUTH_ERROR_CODES.contains(&err.code) => {
            ApiError::AuthenticationError(format!("{} (code {})", err.msg, err.code))
        }
        _ if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            ApiError::AuthenticationError("Invalid API credentials or permissions".to_string())
        }
        Some(err) => ApiError::ExchangeError {
            code: err.code,
            message: err.msg,
        },
        None => {
            log::error!("Unexpected {} response: {}", status, body);
            ApiError::ExchangeError {
                code: i64::from(status.as_u16()),
                message: body.to_string(),
            }
        }
    }
}
