use std::sync::Arc;

use super::client::RestClient;
use super::error::ApiError;
use super::futures::FuturesTrading;
use super::margin::MarginTrading;
use super::proxy::{Prober, ProxyPool, TcpProber};
use super::public::PublicData;
use super::spot::SpotTrading;
use crate::models::ClientSettings;

/// One configured Binance account reached through one proxy pool
///
/// All endpoint groups share the same pool, so a failover triggered by any
/// call is seen by every other call.
pub struct BinanceCoreClient {
    pool: Arc<ProxyPool>,
    spot: SpotTrading,
    margin: MarginTrading,
    futures: FuturesTrading,
    public: PublicData,
}

impl BinanceCoreClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let prober = Arc::new(TcpProber::from_settings(&settings.probe));
        Self::with_prober(settings, prober)
    }

    /// Same as `new`, with a custom liveness check
    pub fn with_prober(settings: ClientSettings, prober: Arc<dyn Prober>) -> Result<Self, ApiError> {
        settings.validate()?;

        let pool = Arc::new(ProxyPool::new(
            settings.proxies.clone(),
            prober,
            settings.request_timeout(),
        )?);
        let rest = Arc::new(RestClient::new(
            settings.credentials(),
            Arc::clone(&pool),
            settings.recv_window_ms,
        ));

        let spot_base_url = settings.spot_base_url();
        let futures_base_url = settings.futures_base_url();

        log::info!(
            "Binance client ready: {} proxies, spot {}, futures {}",
            pool.len(),
            spot_base_url,
            futures_base_url
        );

        Ok(Self {
            spot: SpotTrading::new(Arc::clone(&rest), spot_base_url.clone()),
            margin: MarginTrading::new(Arc::clone(&rest), spot_base_url.clone()),
            futures: FuturesTrading::new(Arc::clone(&rest), futures_base_url.clone()),
            public: PublicData::new(rest, spot_base_url, futures_base_url),
            pool,
        })
    }

    pub fn spot(&self) -> &SpotTrading {
        &self.spot
    }

    pub fn margin(&self) -> &MarginTrading {
        &self.margin
    }

    pub fn futures(&self) -> &FuturesTrading {
        &self.futures
    }

    pub fn public(&self) -> &PublicData {
        &self.public
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }
}
