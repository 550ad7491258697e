use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use super::client::RestClient;
use super::error::ApiError;
use super::signing::QueryParams;
use super::types::{MarginOrderRequest, MarginScope};

const ISOLATED_ACCOUNT_ENDPOINT: &str = "/sapi/v1/margin/isolated/account";
const CROSS_ACCOUNT_ENDPOINT: &str = "/sapi/v1/margin/account";
const ORDER_ENDPOINT: &str = "/sapi/v1/margin/order";
const REPAY_ENDPOINT: &str = "/sapi/v1/margin/repay";

fn isolated_flag(is_isolated: bool) -> &'static str {
    if is_isolated { "TRUE" } else { "FALSE" }
}

/// Cross and isolated margin endpoints
pub struct MarginTrading {
    rest: Arc<RestClient>,
    base_url: String,
}

impl MarginTrading {
    pub fn new(rest: Arc<RestClient>, base_url: impl Into<String>) -> Self {
        Self {
            rest,
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_balance(&self, scope: &MarginScope) -> Result<Value, ApiError> {
        let (endpoint, params) = match scope {
            MarginScope::Isolated(symbol) => (
                ISOLATED_ACCOUNT_ENDPOINT,
                QueryParams::new().push("symbols", symbol),
            ),
            MarginScope::Cross => (CROSS_ACCOUNT_ENDPOINT, QueryParams::new()),
        };

        self.rest
            .send_signed(Method::GET, &self.base_url, endpoint, params)
            .await
    }

    pub(crate) fn order_params(order: &MarginOrderRequest) -> Result<QueryParams, ApiError> {
        let params = QueryParams::new()
            .push("symbol", &order.symbol)
            .push("side", &order.side)
            .push("type", &order.order_type)
            .push("quantity", &order.quantity)
            .push("sideEffectType", &order.side_effect_type)
            .push("isIsolated", isolated_flag(order.is_isolated));

        if order.order_type != "LIMIT" {
            return Ok(params);
        }

        let price = order.price.as_deref().ok_or_else(|| {
            ApiError::InvalidRequest(format!("LIMIT margin order on {} needs a price", order.symbol))
        })?;
        Ok(params.push("price", price))
    }

    pub async fn place_order(&self, order: &MarginOrderRequest) -> Result<Value, ApiError> {
        let params = Self::order_params(order)?;
        let data: Value = self
            .rest
            .send_signed(Method::POST, &self.base_url, ORDER_ENDPOINT, params)
            .await?;

        log::info!("Margin order placed (isolated={}): {}", order.is_isolated, data);
        Ok(data)
    }

    pub async fn repay_loan(
        &self,
        symbol: &str,
        asset: &str,
        amount: f64,
        is_isolated: bool,
    ) -> Result<Value, ApiError> {
        let params = QueryParams::new()
            .push("symbol", symbol)
            .push("asset", asset)
            .push("amount", amount)
            .push("isIsolated", isolated_flag(is_isolated));

        self.rest
            .send_signed(Method::POST, &self.base_url, REPAY_ENDPOINT, params)
            .await
    }
}
