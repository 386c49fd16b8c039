use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Write precondition for [`EventStore::append`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOptions {
    /// Version the writer observed before deciding what to append.
    /// `None` skips the check and is only meant for imports and fixtures.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Unchecked append.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not exist yet; used when an order is first placed.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// Every stored event, in the order it was appended.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// The persistence collaborator for order streams.
///
/// Implementations must make `append` atomic per aggregate: the version check
/// and the write happen as one step, so two writers holding the same expected
/// version can never both succeed.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to one aggregate's stream.
    ///
    /// Either every event is stored or none is. Fails with
    /// `ConcurrencyConflict` when `options.expected_version` is stale and
    /// with `Unavailable` when the backing store can't be reached.
    ///
    /// Returns the aggregate version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// One aggregate's events, oldest first.
    async fn get_events_for_aggregate(&self, aggregate_id: AggregateId)
    -> Result<Vec<EventEnvelope>>;

    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Global stream minus its first `offset` events. Readers that remember
    /// how far they got use this to fetch only the tail.
    async fn stream_from(&self, offset: u64) -> Result<EventStream> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(Box::pin(self.stream_all_events().await?.skip(skip)))
    }
}

/// Checks that a batch is non-empty, targets one aggregate and is numbered
/// consecutively.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    };

    for (offset, event) in (1i64..).zip(events.iter().skip(1)) {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events must belong to the same aggregate".to_string(),
            ));
        }
        let wanted = Version::new(first.version.as_i64() + offset);
        if event.version != wanted {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {wanted}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
