//! HTTP route handlers.

pub mod admin;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;

use common::AggregateId;

use crate::error::ApiError;

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::bad_request("INVALID_ID", format!("Invalid ID format: {e}")))
}
