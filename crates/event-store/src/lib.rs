//! Persistence contract for order event streams.
//!
//! Each aggregate owns one stream. Appends carry the version the writer last
//! observed; a stale version is refused with
//! [`EventStoreError::ConcurrencyConflict`] so read-validate-write cycles on the
//! same aggregate are linearized without locks held across calls.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStream};
