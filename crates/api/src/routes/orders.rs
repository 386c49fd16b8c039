//! Order commit, lookup, transition and audit endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    Actor, Aggregate, CartLine, CustomerInfo, DeliveryMethod, FulfillmentStatus, Order,
    PaymentMethod, PaymentStatus, PlaceOrder, PricedOrder, RequestTransition,
    next_fulfillment_states,
};
use event_store::{EventStore, Version};
use serde::{Deserialize, Serialize};

use super::checkout::{CartLineRequest, parse_cart};
use super::parse_aggregate_id;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer: CustomerInfo,
    pub delivery_method: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub items: Vec<CartLineRequest>,
    #[serde(default)]
    pub voucher_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub fulfillment: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub order_code: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub code: Option<String>,
    pub customer: Option<CustomerInfo>,
    pub delivery_method: Option<DeliveryMethod>,
    pub payment_method: PaymentMethod,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    /// Fulfillment states the order may move to next.
    pub next_states: Vec<FulfillmentStatus>,
    pub refund_due: bool,
    pub lines: Vec<CartLine>,
    pub priced: Option<PricedOrder>,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            code: order.code().map(|c| c.to_string()),
            customer: order.customer().cloned(),
            delivery_method: order.delivery_method(),
            payment_method: order.payment_method(),
            fulfillment_status: order.fulfillment_status(),
            payment_status: order.payment_status(),
            next_states: next_fulfillment_states(order.fulfillment_status()).to_vec(),
            refund_due: order.refund_due(),
            lines: order.lines().to_vec(),
            priced: order.priced().cloned(),
            version: order.version().as_i64(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub order: OrderResponse,
    /// False when the request matched the current state.
    pub changed: bool,
    pub refund_due: bool,
    pub version: i64,
}

/// Response type for event envelope data.
#[derive(Debug, Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

// -- Handlers --

/// POST /orders: re-price the cart and commit it as a new order.
///
/// The submitted cart is priced server-side so the stored snapshot always
/// reflects the catalog at commit time.
#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let (lines, delivery) = parse_cart(&req.items, &req.delivery_method)?;
    let payment_method = match req.payment_method.as_deref() {
        Some(raw) => raw
            .parse::<PaymentMethod>()
            .map_err(|e| ApiError::bad_request(e.code(), e.to_string()))?,
        None => PaymentMethod::default(),
    };

    let quote = state
        .checkout
        .price_checkout(&lines, delivery, req.voucher_code.as_deref())?;

    let cmd = PlaceOrder::for_checkout(
        req.customer,
        delivery,
        payment_method,
        quote.lines,
        quote.priced,
    );
    let order_id = cmd.order_id;
    let result = state.order_service.commit_order(cmd).await?;

    let response = OrderCreatedResponse {
        order_id: order_id.to_string(),
        order_code: result
            .aggregate
            .code()
            .map(|c| c.to_string())
            .unwrap_or_default(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id: load an order aggregate by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let aggregate_id = parse_aggregate_id(&id)?;
    let order = state
        .order_service
        .get_order(aggregate_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders/by-code/:code: load an order by its customer-facing code.
#[tracing::instrument(skip(state))]
pub async fn get_by_code<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .get_order_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {code} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/transition: move one or both status axes.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let aggregate_id = parse_aggregate_id(&id)?;
    let actor = parse_actor(req.actor.as_deref())?;

    let mut cmd = RequestTransition::new(aggregate_id, actor);
    if let Some(raw) = req.fulfillment.as_deref() {
        let to = raw
            .parse::<FulfillmentStatus>()
            .map_err(|e| ApiError::bad_request("UNKNOWN_STATUS", e.to_string()))?;
        cmd = cmd.fulfillment(to);
    }
    if let Some(raw) = req.payment.as_deref() {
        let to = raw
            .parse::<PaymentStatus>()
            .map_err(|e| ApiError::bad_request("UNKNOWN_STATUS", e.to_string()))?;
        cmd = cmd.payment(to);
    }
    if let Some(version) = req.expected_version {
        cmd = cmd.expect_version(Version::new(version));
    }
    if let Some(reason) = req.reason {
        cmd = cmd.reason(reason);
    }

    let outcome = state.order_service.request_transition(cmd).await?;

    Ok(Json(TransitionResponse {
        order: OrderResponse::from(&outcome.order),
        changed: outcome.changed,
        refund_due: outcome.refund_due,
        version: outcome.version.as_i64(),
    }))
}

/// GET /orders/:id/events: the order's audit trail.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let aggregate_id = parse_aggregate_id(&id)?;
    let envelopes = state.order_service.order_events(aggregate_id).await?;

    let responses = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
            metadata: e.metadata.into_iter().collect(),
        })
        .collect();

    Ok(Json(responses))
}

fn parse_actor(raw: Option<&str>) -> Result<Actor, ApiError> {
    match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
        None | Some("admin") => Ok(Actor::Admin),
        Some("customer") => Ok(Actor::Customer),
        Some("system") => Ok(Actor::System),
        Some(other) => Err(ApiError::bad_request(
            "UNKNOWN_ACTOR",
            format!("Unknown actor: {other}"),
        )),
    }
}
