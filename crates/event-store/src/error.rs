use thiserror::Error;

use crate::{AggregateId, Version};

#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Someone else appended to the stream since the writer last read it.
    #[error("Stream {aggregate_id} moved on: expected {expected}, found {actual}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    /// The batch handed to `append` was empty, mixed streams, or skipped a version.
    #[error("Rejected append: {0}")]
    InvalidAppend(String),

    #[error("Payload encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Conflicts and outages can succeed on a later attempt; the rest cannot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
