//! Feeds stored order events into the registered read models.

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// What one catch-up pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatchUpReport {
    /// Events read from the store on this pass, i.e. the unseen tail.
    pub events_seen: u64,
    /// Deliveries made, summed over projections.
    pub delivered: u64,
}

/// Drives projections from the event store.
///
/// Projections only ever see events through a catch-up pass: the store is
/// streamed from the slowest projection's position and each projection
/// receives the events beyond its own, so a projection registered late or
/// reset simply replays.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,

    /// Held for a whole pass so positions advance once per event even when
    /// several requests catch up at the same time.
    running: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            running: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Brings every projection up to the end of the store.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<CatchUpReport> {
        let _running = self.running.lock().await;
        self.catch_up().await
    }

    /// Resets every projection, then replays the whole store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<CatchUpReport> {
        let _running = self.running.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        tracing::info!(projections = self.projections.len(), "Rebuilding read models");
        self.catch_up().await
    }

    async fn catch_up(&self) -> Result<CatchUpReport> {
        let mut report = CatchUpReport::default();
        if self.projections.is_empty() {
            return Ok(report);
        }

        // Resume from the slowest projection instead of the start of the log.
        let mut start = u64::MAX;
        for projection in &self.projections {
            start = start.min(projection.position().await.events_processed);
        }

        let mut stream = self.store.stream_from(start).await?;
        let mut ordinal = start;

        while let Some(event) = stream.next().await {
            let event = event?;
            report.events_seen += 1;
            ordinal += 1;

            for projection in &self.projections {
                if !projection.position().await.is_behind(ordinal) {
                    continue;
                }
                if let Err(e) = projection.handle(&event).await {
                    tracing::error!(
                        projection = projection.name(),
                        event_id = %event.event_id,
                        event_type = %event.event_type,
                        error = %e,
                        "Projection failed"
                    );
                    return Err(e);
                }
                report.delivered += 1;
                metrics::counter!(
                    "projections_events_processed",
                    "projection" => projection.name()
                )
                .increment(1);
            }
        }

        tracing::debug!(
            from = start,
            events_seen = report.events_seen,
            delivered = report.delivered,
            "Catch-up complete"
        );
        Ok(report)
    }
}
