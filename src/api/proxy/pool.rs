use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::probe::{Prober, TcpProber};
use super::session::ProxySession;
use crate::api::error::ApiError;
use crate::models::{ClientSettings, ProxyDescriptor};

/// Observable state of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Unbound,
    Bound { index: usize, session_id: Uuid },
}

#[derive(Debug, Default)]
struct PoolState {
    cursor: usize,
    active: Option<Arc<ProxySession>>,
}

impl PoolState {
    fn advance(&mut self, len: usize) {
        self.cursor = (self.cursor + 1) % len;
    }

    fn status(&self) -> PoolStatus {
        match self.active {
            Some(ref session) => PoolStatus::Bound {
                index: session.index(),
                session_id: session.id(),
            },
            None => PoolStatus::Unbound,
        }
    }
}

/// Rotating set of candidate proxies with one lazily bound session
///
/// The cursor/session pair sits behind an async mutex held for the whole
/// probe-and-rebind sequence, so concurrent callers hitting a dead proxy
/// trigger a single failover and then share the new session.
pub struct ProxyPool {
    candidates: Vec<ProxyDescriptor>,
    prober: Arc<dyn Prober>,
    request_timeout: Duration,
    state: Mutex<PoolState>,
}

impl ProxyPool {
    pub fn new(
        candidates: Vec<ProxyDescriptor>,
        prober: Arc<dyn Prober>,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        if candidates.is_empty() {
            return Err(ApiError::ConfigError(
                "Proxy pool needs at least one candidate".to_string(),
            ));
        }

        Ok(Self {
            candidates,
            prober,
            request_timeout,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Pool probing through `TcpProber` as configured in `settings`
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ApiError> {
        let prober = Arc::new(TcpProber::from_settings(&settings.probe));
        Self::new(settings.proxies.clone(), prober, settings.request_timeout())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[ProxyDescriptor] {
        &self.candidates
    }

    pub async fn cursor(&self) -> usize {
        self.state.lock().await.cursor
    }

    pub async fn status(&self) -> PoolStatus {
        self.state.lock().await.status()
    }

    pub async fn is_bound(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    /// Liveness check of a single candidate; never errors
    pub async fn probe(&self, proxy: &ProxyDescriptor) -> bool {
        self.prober.probe(proxy).await
    }

    /// Move the cursor to the next candidate. The active session is left alone.
    pub async fn advance(&self) {
        let len = self.len();
        self.state.lock().await.advance(len);
    }

    /// Bind a fresh session to the candidate at the cursor
    pub async fn bind(&self) -> Result<Arc<ProxySession>, ApiError> {
        let mut state = self.state.lock().await;
        self.bind_locked(&mut state)
    }

    /// Drop the active session so the next call re-acquires
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.active.take() {
            let age = chrono::Utc::now() - session.bound_at();
            log::warn!(
                "Discarding session through proxy {} after {}s",
                session.proxy(),
                age.num_seconds()
            );
        }
    }

    /// One sweep over all candidates starting at the cursor
    pub async fn acquire_working_session(&self) -> Result<Arc<ProxySession>, ApiError> {
        let mut state = self.state.lock().await;
        self.acquire_locked(&mut state).await
    }

    /// Session for the next outbound call
    ///
    /// A bound session is re-probed first and reused unchanged if its proxy
    /// still answers; otherwise it is dropped and a full sweep runs from the
    /// current cursor.
    pub async fn get_session(&self) -> Result<Arc<ProxySession>, ApiError> {
        let mut state = self.state.lock().await;

        if let Some(session) = state.active.clone() {
            if self.prober.probe(session.proxy()).await {
                return Ok(session);
            }
            log::warn!("Bound proxy {} stopped responding, failing over", session.proxy());
            state.active = None;
        }

        self.acquire_locked(&mut state).await
    }

    fn bind_locked(&self, state: &mut PoolState) -> Result<Arc<ProxySession>, ApiError> {
        let proxy = &self.candidates[state.cursor];
        let session = Arc::new(ProxySession::bind(state.cursor, proxy, self.request_timeout)?);

        log::info!("Bound outbound session to proxy {} (#{})", proxy, state.cursor);
        state.active = Some(Arc::clone(&session));
        Ok(session)
    }

    async fn acquire_locked(&self, state: &mut PoolState) -> Result<Arc<ProxySession>, ApiError> {
        let len = self.len();
        state.active = None;

        for _ in 0..len {
            let proxy = &self.candidates[state.cursor];

            if self.prober.probe(proxy).await {
                match self.bind_locked(state) {
                    Ok(session) => return Ok(session),
                    Err(e) => log::warn!("Proxy {} is alive but unusable: {}", proxy, e),
                }
            } else {
                log::debug!("Proxy {} (#{}) is down, rotating", proxy, state.cursor);
            }

            state.advance(len);
        }

        log::warn!("No working proxy among {} candidates", len);
        Err(ApiError::NoWorkingProxy { tried: len })
    }
}
