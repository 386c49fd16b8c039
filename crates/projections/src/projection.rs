//! The projection seam: anything that folds stored events into a read model.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// Count of store events a projection has already folded in.
///
/// Positions are ordinal, not versions: the store's global order is the only
/// order a projection sees, so "three events in" is all it needs to resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub events_processed: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
        }
    }

    /// True when the `ordinal`-th event of the store (1-based) is still unseen.
    pub fn is_behind(&self, ordinal: u64) -> bool {
        self.events_processed < ordinal
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.events_processed)
    }
}

/// Folds stored order events into a read model.
///
/// `handle` sees every event in store order, including events of aggregates
/// it does not care about; those still advance the position.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Stable label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Drops all derived state and rewinds to [`ProjectionPosition::zero`].
    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_position_is_behind_first_event() {
        let pos = ProjectionPosition::zero();
        assert!(pos.is_behind(1));
        assert!(!pos.is_behind(0));
    }

    #[test]
    fn test_advanced_position_catches_up() {
        let pos = ProjectionPosition::zero().advance().advance();
        assert_eq!(pos.events_processed, 2);
        assert!(!pos.is_behind(2));
        assert!(pos.is_behind(3));
        assert!(pos > ProjectionPosition::zero());
    }

    #[test]
    fn test_position_display() {
        let pos = ProjectionPosition { events_processed: 42 };
        assert_eq!(pos.to_string(), "@42");
    }
}
