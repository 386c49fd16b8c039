//! Back-office order board.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::FulfillmentStatus;
use event_store::EventStore;
use projections::OrderSummary;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderBoardResponse {
    pub orders: Vec<OrderSummary>,
    /// Order count per fulfillment status, across the whole board.
    pub counts: BTreeMap<&'static str, usize>,
    pub refunds_due: usize,
}

/// GET /admin/orders?status=: orders from the board projection, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_orders<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<OrderBoardResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<FulfillmentStatus>)
        .transpose()
        .map_err(|e| ApiError::bad_request("UNKNOWN_STATUS", e.to_string()))?;

    // Run catch-up so the board includes the latest events
    state.projection_processor.run_catch_up().await?;

    let board = &state.order_board;
    let counts = board
        .counts_by_status()
        .await
        .into_iter()
        .map(|(status, n)| (status.as_str(), n))
        .collect();

    Ok(Json(OrderBoardResponse {
        orders: board.list(status).await,
        counts,
        refunds_due: board.refunds_due().await.len(),
    }))
}
