//! Binance REST client that signs private calls with HMAC-SHA256 and routes
//! all traffic through a pool of proxies, failing over when the active one
//! stops answering.
//!
//! ```ignore
//! let settings = ClientSettings::from_json_file("binance.json")?;
//! let client = BinanceCoreClient::new(settings)?;
//!
//! let price = client.public().symbol_price("BTCUSDT").await?;
//! let order = client
//!     .spot()
//!     .place_order(&SpotOrderRequest::limit("BTCUSDT", "BUY", "0.001", "42000"))
//!     .await?;
//! ```

pub mod api;
pub mod models;

pub use api::{
    ApiError, BinanceCoreClient, FuturesOrderRequest, KlineMarket, MarginOrderRequest, MarginScope,
    MarginType, Prober, ProxyPool, QueryParams, SpotOrderRequest, TcpProber,
};
pub use models::{ClientSettings, Credentials, ProbeSettings, ProxyDescriptor, ProxyKind};
