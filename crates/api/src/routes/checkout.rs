//! Checkout pricing and flash-sale status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{CartLine, CheckoutError, CheckoutQuote, DeliveryMethod, FlashSaleId, Money, SaleSnapshot};
use event_store::EventStore;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub unit_price: i64,
    #[serde(default)]
    pub discounted_unit_price: Option<i64>,
    pub quantity: i64,
}

impl CartLineRequest {
    fn to_line(&self) -> Result<CartLine, CheckoutError> {
        let line = CartLine::new(
            self.product_id.as_str(),
            Money::new(self.unit_price),
            self.quantity,
        )?;
        Ok(match self.discounted_unit_price {
            Some(price) => line.with_discounted_price(Money::new(price))?,
            None => line,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceCheckoutRequest {
    pub items: Vec<CartLineRequest>,
    pub delivery_method: String,
    #[serde(default)]
    pub voucher_code: Option<String>,
}

/// Turns raw cart input into validated lines and a delivery method.
pub(crate) fn parse_cart(
    items: &[CartLineRequest],
    delivery_method: &str,
) -> Result<(Vec<CartLine>, DeliveryMethod), ApiError> {
    let lines = items
        .iter()
        .map(CartLineRequest::to_line)
        .collect::<Result<Vec<_>, _>>()?;
    let delivery = delivery_method
        .parse::<DeliveryMethod>()
        .map_err(CheckoutError::from)?;
    Ok((lines, delivery))
}

// -- Handlers --

/// POST /checkout/price: price a cart with flash sales and an optional voucher.
#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn price<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PriceCheckoutRequest>,
) -> Result<Json<CheckoutQuote>, ApiError> {
    let (lines, delivery) = parse_cart(&req.items, &req.delivery_method)?;
    let quote = state
        .checkout
        .price_checkout(&lines, delivery, req.voucher_code.as_deref())?;
    Ok(Json(quote))
}

/// GET /flash-sales/:id: status and countdown of one sale.
#[tracing::instrument(skip(state))]
pub async fn flash_sale<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SaleSnapshot>, ApiError> {
    state
        .checkout
        .classify_flash_sale(&FlashSaleId::new(id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Flash sale {id} not found")))
}
