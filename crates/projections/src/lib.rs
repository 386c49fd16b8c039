//! Back-office views derived from the order event log.
//!
//! The [`OrderBoardView`] is the only view today. It is fed by a
//! [`ProjectionProcessor`] catch-up pass and can always be rebuilt from
//! scratch, so it is never a source of truth.

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::{CatchUpReport, ProjectionProcessor};
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{OrderBoardView, OrderSummary};
