use common::AggregateId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Could not read events: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    #[error("Unreadable order event payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A status change arrived for an order the view has never seen placed.
    #[error("Status change for unknown order {0}")]
    UnknownOrder(AggregateId),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
