use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::ProxyDescriptor;

/// An HTTP client whose every request is routed through one proxy
#[derive(Debug)]
pub struct ProxySession {
    id: Uuid,
    index: usize,
    proxy: ProxyDescriptor,
    client: reqwest::Client,
    bound_at: DateTime<Utc>,
}

impl ProxySession {
    /// Build a client routed through `proxy`, remembering the pool index it came from
    pub fn bind(index: usize, proxy: &ProxyDescriptor, request_timeout: Duration) -> Result<Self, ApiError> {
        let proxy_url = proxy.proxy_url()?;
        let client = reqwest::Client::builder()
            .proxy(reqwest::Proxy::all(proxy_url.as_str())?)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            id: Uuid::new_v4(),
            index,
            proxy: proxy.clone(),
            client,
            bound_at: Utc::now(),
        })
    }

    /// Unique per binding; a rebind to the same proxy gets a new id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Pool index of the proxy at binding time
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn proxy(&self) -> &ProxyDescriptor {
        &self.proxy
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn bound_at(&self) -> DateTime<Utc> {
        self.bound_at
    }
}
