use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// Error body returned by Binance on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTime {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolPrice {
    pub symbol: String,
    /// Decimal string, e.g. "43125.01000000"
    pub price: String,
}

/// Open order as listed by `/api/v3/openOrders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: u64,
    /// Remaining fields, passed through untouched
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// Leverage brackets for one futures symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageBracket {
    pub symbol: String,
    pub brackets: Vec<Bracket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bracket {
    pub bracket: u32,
    #[serde(rename = "initialLeverage")]
    pub initial_leverage: u32,
    #[serde(rename = "notionalCap", default)]
    pub notional_cap: f64,
    #[serde(rename = "notionalFloor", default)]
    pub notional_floor: f64,
}

/// Which market a kline request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlineMarket {
    Spot,
    Futures,
}

impl KlineMarket {
    pub fn path(&self) -> &'static str {
        match self {
            KlineMarket::Spot => "/api/v3/klines",
            KlineMarket::Futures => "/fapi/v1/klines",
        }
    }
}

/// One candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64, // Unix milliseconds
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: f64,
    pub taker_buy_quote_asset_volume: f64,
}

impl Kline {
    pub fn open_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.open_time).single()
    }

    pub fn close_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.close_time).single()
    }

    /// Parse Binance's array form. The trailing "ignore" field is optional.
    pub fn from_row(row: &[Value]) -> Result<Self, ApiError> {
        if row.len() < 11 {
            return Err(ApiError::ParseError(format!(
                "Kline row has {} fields, expected at least 11",
                row.len()
            )));
        }

        let trades = int_field(&row[8], "number_of_trades")?;
        let number_of_trades = u64::try_from(trades).map_err(|_| {
            ApiError::ParseError(format!("Kline field number_of_trades is negative: {}", trades))
        })?;

        Ok(Self {
            open_time: int_field(&row[0], "open_time")?,
            open: decimal_field(&row[1], "open")?,
            high: decimal_field(&row[2], "high")?,
            low: decimal_field(&row[3], "low")?,
            close: decimal_field(&row[4], "close")?,
            volume: decimal_field(&row[5], "volume")?,
            close_time: int_field(&row[6], "close_time")?,
            quote_asset_volume: decimal_field(&row[7], "quote_asset_volume")?,
            number_of_trades,
            taker_buy_base_asset_volume: decimal_field(&row[9], "taker_buy_base_asset_volume")?,
            taker_buy_quote_asset_volume: decimal_field(&row[10], "taker_buy_quote_asset_volume")?,
        })
    }
}

fn int_field(value: &Value, name: &str) -> Result<i64, ApiError> {
    value
        .as_i64()
        .ok_or_else(|| ApiError::ParseError(format!("Kline field {} is not an integer: {}", name, value)))
}

// Binance sends prices as strings; accept plain numbers too
fn decimal_field(value: &Value, name: &str) -> Result<f64, ApiError> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| ApiError::ParseError(format!("Kline field {} = {:?}: {}", name, s, e))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ApiError::ParseError(format!("Kline field {} out of range", name))),
        other => Err(ApiError::ParseError(format!(
            "Kline field {} has unexpected type: {}",
            name, other
        ))),
    }
}

/// Spot order as accepted by `/api/v3/order`
#[derive(Debug, Clone)]
pub struct SpotOrderRequest {
    pub symbol: String,
    pub side: String,       // "BUY" or "SELL"
    pub order_type: String, // "MARKET", "LIMIT", "LIMIT_MAKER", ...
    pub quantity: String,
    pub price: Option<String>,
    pub time_in_force: String,
}

impl SpotOrderRequest {
    pub fn market(symbol: impl Into<String>, side: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            order_type: "MARKET".to_string(),
            quantity: quantity.into(),
            price: None,
            time_in_force: "GTC".to_string(),
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            order_type: "LIMIT".to_string(),
            price: Some(price.into()),
            ..Self::market(symbol, side, quantity)
        }
    }
}

/// Cross or isolated margin account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginScope {
    Cross,
    /// Isolated margin for one symbol, e.g. "BTCUSDT"
    Isolated(String),
}

impl MarginScope {
    pub fn is_isolated(&self) -> bool {
        matches!(self, MarginScope::Isolated(_))
    }
}

#[derive(Debug, Clone)]
pub struct MarginOrderRequest {
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub quantity: String,
    pub price: Option<String>,
    pub is_isolated: bool,
    /// "NO_SIDE_EFFECT", "MARGIN_BUY", "AUTO_REPAY", ...
    pub side_effect_type: String,
}

#[derive(Debug, Clone)]
pub struct FuturesOrderRequest {
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub quantity: f64,
    pub price: Option<f64>,
    pub leverage: Option<u32>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// Futures margin mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginType {
    Isolated,
    Crossed,
}

impl MarginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginType::Isolated => "ISOLATED",
            MarginType::Crossed => "CROSSED",
        }
    }
}
