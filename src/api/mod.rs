pub mod client;
pub mod core_client;
pub mod error;
pub mod futures;
pub mod margin;
pub mod proxy;
pub mod public;
pub mod signing;
pub mod spot;
pub mod types;

pub use client::RestClient;
pub use core_client::BinanceCoreClient;
pub use error::ApiError;
pub use futures::FuturesTrading;
pub use margin::MarginTrading;
pub use proxy::{PoolStatus, Prober, ProxyPool, ProxySession, TcpProber};
pub use public::PublicData;
pub use signing::{auth_header, sign, sign_request, timestamp_millis, QueryParams, SignedRequest};
pub use spot::SpotTrading;
pub use types::*;
