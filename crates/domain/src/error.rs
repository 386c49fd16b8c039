//! Domain error types.

use common::AggregateId;
use event_store::{EventStoreError, Version};
use thiserror::Error;

use crate::order::{OrderError, TransitionError};

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order command was rejected.
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    /// Another writer changed the order first. Re-fetch and retry.
    #[error("Conflict on order {aggregate_id}: expected {expected}, found {actual}")]
    Conflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The store could not be reached in time. Safe to retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Every generated order code was already taken.
    #[error("No free order code after {attempts} attempts")]
    OrderCodeExhausted { attempts: u32 },

    /// Any other event store failure.
    #[error("Event store error: {0}")]
    Store(EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true for failures a caller may retry after re-reading.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::Conflict { .. } | DomainError::StoreUnavailable(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Conflict { .. })
    }
}

impl From<EventStoreError> for DomainError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::Conflict {
                aggregate_id,
                expected,
                actual,
            },
            EventStoreError::Unavailable(reason) => DomainError::StoreUnavailable(reason),
            EventStoreError::Serialization(e) => DomainError::Serialization(e),
            other => DomainError::Store(other),
        }
    }
}

impl From<TransitionError> for DomainError {
    fn from(e: TransitionError) -> Self {
        DomainError::Order(OrderError::Transition(e))
    }
}
