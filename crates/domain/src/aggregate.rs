//! Traits every event-sourced aggregate in the domain implements.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded on an aggregate stream, named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// An aggregate is rebuilt by replaying its events in version order.
/// Commands never mutate it directly: they return events, and `apply` folds
/// those events into state.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Stream family written into every envelope, e.g. `Order`.
    fn aggregate_type() -> &'static str;

    /// Returns None for an aggregate with no events yet.
    fn id(&self) -> Option<AggregateId>;

    /// Version of the last applied event, `0` when new.
    fn version(&self) -> Version;

    /// Set by the command handler while replaying and after a commit.
    fn set_version(&mut self, version: Version);

    /// Folds one event into state. Must be deterministic and infallible:
    /// the event already happened.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
