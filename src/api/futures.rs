use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use super::client::RestClient;
use super::error::ApiError;
use super::signing::QueryParams;
use super::types::{FuturesOrderRequest, LeverageBracket, MarginType};

const EXCHANGE_INFO_ENDPOINT: &str = "/fapi/v1/exchangeInfo";
const ACCOUNT_ENDPOINT: &str = "/fapi/v2/account";
const POSITION_RISK_ENDPOINT: &str = "/fapi/v2/positionRisk";
const ORDER_ENDPOINT: &str = "/fapi/v1/order";
const LEVERAGE_ENDPOINT: &str = "/fapi/v1/leverage";
const MARGIN_TYPE_ENDPOINT: &str = "/fapi/v1/marginType";
const LEVERAGE_BRACKET_ENDPOINT: &str = "/fapi/v1/leverageBracket";

/// USD-M futures endpoints
pub struct FuturesTrading {
    rest: Arc<RestClient>,
    base_url: String,
}

impl FuturesTrading {
    pub fn new(rest: Arc<RestClient>, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    /// Symbols and trading rules (public)
    pub async fn exchange_info(&self) -> Result<Value, ApiError> {
        self.rest
            .send_public(&self.base_url, EXCHANGE_INFO_ENDPOINT, QueryParams::new())
            .await
    }

    /// Balances and positions
    pub async fn account(&self) -> Result<Value, ApiError> {
        self.rest
            .send_signed(Method::GET, &self.base_url, ACCOUNT_ENDPOINT, QueryParams::new())
            .await
    }

    pub async fn position_information(&self, symbol: &str) -> Result<Value, ApiError> {
        let params = QueryParams::new().push("symbol", symbol);
        self.rest
            .send_signed(Method::GET, &self.base_url, POSITION_RISK_ENDPOINT, params)
            .await
    }

    pub async fn open_positions(&self) -> Result<Value, ApiError> {
        self.rest
            .send_signed(Method::GET, &self.base_url, POSITION_RISK_ENDPOINT, QueryParams::new())
            .await
    }

    /// Parameters for `/fapi/v1/order`
    ///
    /// A stop loss or take profit turns the order into the matching
    /// `*_LIMIT` type; when both are set the take profit wins.
    pub(crate) fn order_params(order: &FuturesOrderRequest) -> Result<QueryParams, ApiError> {
        let mut order_type = order.order_type.clone();
        let mut stop_price = None;
        let mut time_in_force = None;

        if order.order_type == "LIMIT" {
            time_in_force = Some("GTC");
        }
        if let Some(stop_loss) = order.stop_loss {
            order_type = "STOP_LOSS_LIMIT".to_string();
            stop_price = Some(stop_loss);
            time_in_force = Some("GTC");
        }
        if let Some(take_profit) = order.take_profit {
            order_type = "TAKE_PROFIT_LIMIT".to_string();
            stop_price = Some(take_profit);
            time_in_force = Some("GTC");
        }

        let price = if order.order_type == "LIMIT" {
            let price = order.price.ok_or_else(|| {
                ApiError::InvalidRequest(format!("LIMIT order on {} needs a price", order.symbol))
            })?;
            Some(price)
        } else {
            None
        };

        Ok(QueryParams::new()
            .push("symbol", &order.symbol)
            .push("side", &order.side)
            .push("type", order_type)
            .push("quantity", order.quantity)
            .push_opt("price", price)
            .push_opt("timeInForce", time_in_force)
            .push_opt("stopPrice", stop_price))
    }

    /// Place an order, setting leverage first when requested
    pub async fn create_order(&self, order: &FuturesOrderRequest) -> Result<Value, ApiError> {
        let params = Self::order_params(order)?;

        if let Some(leverage) = order.leverage {
            self.set_leverage(&order.symbol, leverage).await?;
        }

        let data: Value = self
            .rest
            .send_signed(Method::POST, &self.base_url, ORDER_ENDPOINT, params)
            .await?;

        log::info!("Futures order placed: {}", data);
        Ok(data)
    }

    /// Market order with `reduceOnly=true`
    pub async fn close_position_reduce_only(
        &self,
        symbol: &str,
        side: &str,
        quantity: f64,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .push("symbol", symbol)
            .push("side", side)
            .push("type", "MARKET")
            .push("reduceOnly", "true")
            .push("quantity", round_quantity(quantity));

        self.rest
            .send_signed(Method::POST, &self.base_url, ORDER_ENDPOINT, params)
            .await
    }

    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .push("symbol", symbol)
            .push("leverage", leverage);

        self.rest
            .send_signed(Method::POST, &self.base_url, LEVERAGE_ENDPOINT, params)
            .await
    }

    pub async fn change_margin_type(&self, symbol: &str, margin_type: MarginType) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .push("symbol", symbol)
            .push("marginType", margin_type.as_str());

        self.rest
            .send_signed(Method::POST, &self.base_url, MARGIN_TYPE_ENDPOINT, params)
            .await
    }

    /// Initial leverage of the first bracket, if the symbol is listed
    pub async fn max_leverage(&self, symbol: &str) -> Result<Option<u32>, ApiError> {
        let params = QueryParams::new().push("symbol", symbol);
        let brackets: Vec<LeverageBracket> = self
            .rest
            .send_signed(Method::GET, &self.base_url, LEVERAGE_BRACKET_ENDPOINT, params)
            .await?;

        Ok(first_bracket_leverage(&brackets, symbol))
    }
}

pub(crate) fn first_bracket_leverage(brackets: &[LeverageBracket], symbol: &str) -> Option<u32> {
    brackets
        .iter()
        .find(|b| b.symbol == symbol)
        .and_then(|b| b.brackets.first())
        .map(|b| b.initial_leverage)
}

/// Round to 8 decimals, the finest step Binance accepts
fn round_quantity(quantity: f64) -> f64 {
    (quantity * 1e8).round() / 1e8
}
