use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event store.
///
/// Serves the single-node deployment and the test suites. Appends take the
/// write lock for the whole check-and-insert, which is what makes the
/// optimistic version check atomic. [`set_available`](Self::set_available)
/// simulates an unreachable backend.
#[derive(Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Toggles whether calls succeed or fail with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EventStoreError::Unavailable(
                "in-memory store is switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        self.ensure_available()?;
        validate_events_for_append(&events)?;

        let Some(first_event) = events.first() else {
            return Ok(Version::initial());
        };
        let aggregate_id = first_event.aggregate_id;
        let first_new_version = first_event.version;

        let mut store = self.events.write().await;

        let current_version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Two events at the same version would fork the stream.
        if first_new_version <= current_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        store.extend(events);

        tracing::trace!(%aggregate_id, version = %last_version, "events appended");
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.ensure_available()?;
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        self.stream_from(0).await
    }

    async fn stream_from(&self, offset: u64) -> Result<EventStream> {
        use futures_util::stream;

        self.ensure_available()?;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let tail: Vec<_> = self.events.read().await.iter().skip(skip).cloned().collect();
        Ok(Box::pin(stream::iter(tail.into_iter().map(Ok))))
    }
}
