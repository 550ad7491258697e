use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::client::RestClient;
use super::error::ApiError;
use super::signing::{timestamp_millis, QueryParams};
use super::types::{Kline, KlineMarket, ServerTime, SymbolPrice};

const PING_ENDPOINT: &str = "/api/v3/ping";
const TIME_ENDPOINT: &str = "/api/v3/time";
const PRICE_ENDPOINT: &str = "/api/v3/ticker/price";

/// Largest page Binance serves for klines
const KLINE_PAGE_LIMIT: u32 = 1000;
const KLINE_PAGE_PAUSE: Duration = Duration::from_secs(1);

/// Unauthenticated market data
pub struct PublicData {
    rest: Arc<RestClient>,
    spot_base_url: String,
    futures_base_url: String,
}

impl PublicData {
    pub fn new(rest: Arc<RestClient>, spot_base_url: impl Into<String>, futures_base_url: impl Into<String>) -> Self {
        Self {
            rest,
            spot_base_url: spot_base_url.into(),
            futures_base_url: futures_base_url.into(),
        }
    }

    pub async fn ping(&self) -> Result<(), ApiError> {
        let _: Value = self
            .rest
            .send_public(&self.spot_base_url, PING_ENDPOINT, QueryParams::new())
            .await?;
        Ok(())
    }

    pub async fn server_time(&self) -> Result<ServerTime, ApiError> {
        self.rest
            .send_public(&self.spot_base_url, TIME_ENDPOINT, QueryParams::new())
            .await
    }

    /// Latest spot price of `symbol`
    pub async fn symbol_price(&self, symbol: &str) -> Result<f64, ApiError> {
        let params = QueryParams::new().push("symbol", symbol);
        let ticker: SymbolPrice = self
            .rest
            .send_public(&self.spot_base_url, PRICE_ENDPOINT, params)
            .await?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|e| ApiError::ParseError(format!("Invalid price {:?}: {}", ticker.price, e)))
    }

    /// Fetch up to `limit` klines ending at `end_time` (default: now)
    ///
    /// Pages backwards in chunks of at most 1000 and returns rows in
    /// ascending open-time order. Stops early when the exchange runs out of
    /// history.
    pub async fn klines_extended(
        &self,
        market: KlineMarket,
        symbol: &str,
        interval: &str,
        limit: u32,
        end_time: Option<i64>,
    ) -> Result<Vec<Kline>, ApiError> {
        let base_url = match market {
            KlineMarket::Spot => &self.spot_base_url,
            KlineMarket::Futures => &self.futures_base_url,
        };

        let mut end_time = end_time.unwrap_or_else(timestamp_millis);
        let mut remaining = limit;
        let mut klines: Vec<Kline> = Vec::new();

        while remaining > 0 {
            let chunk_size = remaining.min(KLINE_PAGE_LIMIT);
            let params = QueryParams::new()
                .push("symbol", symbol)
                .push("interval", interval)
                .push("limit", chunk_size)
                .push("endTime", end_time);

            let rows: Vec<Vec<Value>> = self.rest.send_public(base_url, market.path(), params).await?;
            if rows.is_empty() {
                break;
            }

            let page = rows
                .iter()
                .map(|row| Kline::from_row(row))
                .collect::<Result<Vec<_>, _>>()?;

            let earliest = page.iter().map(|k| k.open_time).min().unwrap_or(end_time);
            end_time = earliest - 1;
            klines.extend(page);

            remaining = remaining.saturating_sub(chunk_size);
            if remaining > KLINE_PAGE_LIMIT {
                tokio::time::sleep(KLINE_PAGE_PAUSE).await;
            }
        }

        klines.sort_by_key(|k| k.open_time);
        klines.dedup_by_key(|k| k.open_time);
        Ok(klines)
    }
}
