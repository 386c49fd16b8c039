//! Load, decide, append: the write path shared by every aggregate.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};
use serde::Serialize;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(1);

/// What a successful commit left behind.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State with the committed events folded in.
    pub aggregate: A,
    /// Exactly what was appended; empty when the command was a no-op.
    pub events: Vec<A::Event>,
    pub new_version: Version,
}

/// Loads aggregates, runs commands against them and appends the resulting
/// events with an optimistic version check.
///
/// Every store call is bounded by `store_timeout`; a call that takes longer
/// fails with [`DomainError::StoreUnavailable`] instead of hanging.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    store_timeout: Duration,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            _phantom: PhantomData,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Runs a store call under the handler's timeout.
    pub async fn guarded<T, F>(&self, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = event_store::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(DomainError::from),
            Err(_) => {
                tracing::error!(timeout = ?self.store_timeout, "Store call timed out");
                Err(DomainError::StoreUnavailable(format!(
                    "no response within {:?}",
                    self.store_timeout
                )))
            }
        }
    }

    /// Raw events of one aggregate, oldest first.
    pub async fn events(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>, DomainError> {
        self.guarded(self.store.get_events_for_aggregate(aggregate_id))
            .await
    }

    /// Replays the aggregate's stream. An unknown id yields `A::default()`
    /// at version zero.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let envelopes = self.events(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in envelopes {
            let version = envelope.version;
            aggregate.apply(serde_json::from_value(envelope.payload)?);
            aggregate.set_version(version);
        }
        Ok(aggregate)
    }

    /// Like [`load`](Self::load), but `None` for a stream with no events.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Appends `events` on top of `aggregate`, expecting the store to still be
    /// at the aggregate's version.
    pub async fn commit(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        events: Vec<A::Event>,
        recorded_at: DateTime<Utc>,
    ) -> Result<CommandResult<A>, DomainError> {
        let current_version = aggregate.version();
        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events, recorded_at)?;
        // Version zero doubles as "stream must not exist".
        let options = AppendOptions::expect_version(current_version);
        let new_version = self.guarded(self.store.append(envelopes, options)).await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
        recorded_at: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope>, DomainError>
    where
        A::Event: Serialize,
    {
        let mut version = current_version;
        events
            .iter()
            .map(|event| -> Result<EventEnvelope, DomainError> {
                version = version.next();
                let envelope = EventEnvelope::encode(
                    aggregate_id,
                    A::aggregate_type(),
                    event.event_type(),
                    version,
                    event,
                )?;
                Ok(envelope.recorded_at(recorded_at))
            })
            .collect()
    }
}
