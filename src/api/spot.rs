use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use super::client::RestClient;
use super::error::ApiError;
use super::signing::QueryParams;
use super::types::{OpenOrder, SpotOrderRequest};

const ORDER_ENDPOINT: &str = "/api/v3/order";
const OPEN_ORDERS_ENDPOINT: &str = "/api/v3/openOrders";

/// Spot order placement and cancellation
pub struct SpotTrading {
    rest: Arc<RestClient>,
    base_url: String,
}

impl SpotTrading {
    pub fn new(rest: Arc<RestClient>, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    /// Parameters for `/api/v3/order`, in the order they are signed
    pub(crate) fn order_params(order: &SpotOrderRequest) -> Result<QueryParams, ApiError> {
        let params = QueryParams::new()
            .push("symbol", &order.symbol)
            .push("side", &order.side)
            .push("type", &order.order_type);

        let params = match order.order_type.as_str() {
            "LIMIT" => params
                .push("timeInForce", &order.time_in_force)
                .push("price", require_price(order)?)
                .push("quantity", &order.quantity),
            "LIMIT_MAKER" => params
                .push("price", require_price(order)?)
                .push("quantity", &order.quantity),
            _ => params.push("quantity", &order.quantity),
        };

        Ok(params)
    }

    /// Place a spot order (MARKET, LIMIT, LIMIT_MAKER)
    pub async fn place_order(&self, order: &SpotOrderRequest) -> Result<Value, ApiError> {
        let params = Self::order_params(order)?;
        let data: Value = self
            .rest
            .send_signed(Method::POST, &self.base_url, ORDER_ENDPOINT, params)
            .await?;

        log::info!("Spot order placed: {}", data);
        Ok(data)
    }

    /// Cancel one order by id
    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .push("symbol", symbol)
            .push("orderId", order_id);

        let data: Value = self
            .rest
            .send_signed(Method::DELETE, &self.base_url, ORDER_ENDPOINT, params)
            .await?;

        log::info!("Spot order canceled: {}", data);
        Ok(data)
    }

    pub async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ApiError> {
        let params = QueryParams::new().push("symbol", symbol);
        self.rest
            .send_signed(Method::GET, &self.base_url, OPEN_ORDERS_ENDPOINT, params)
            .await
    }

    /// Cancel every open order on `symbol`, one by one
    ///
    /// Stops at the first failed cancellation; orders before it stay cancelled.
    pub async fn cancel_all_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, ApiError> {
        let open_orders = self.open_orders(symbol).await?;

        for order in &open_orders {
            self.cancel_order(symbol, order.order_id).await?;
        }

        log::info!("All {} open spot orders for {} canceled", open_orders.len(), symbol);
        Ok(open_orders)
    }
}

fn require_price(order: &SpotOrderRequest) -> Result<&str, ApiError> {
    order.price.as_deref().ok_or_else(|| {
        ApiError::InvalidRequest(format!("{} order on {} needs a price", order.order_type, order.symbol))
    })
}
