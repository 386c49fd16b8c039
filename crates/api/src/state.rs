//! Shared application state.

use std::sync::Arc;

use common::Clock;
use domain::{Checkout, InMemoryOrderCodeRegistry, OrderService, PricingEngine};
use event_store::EventStore;
use projections::{OrderBoardView, Projection, ProjectionProcessor};

use crate::catalog::Catalog;
use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub checkout: Checkout,
    pub order_service: OrderService<S>,
    pub order_board: OrderBoardView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

/// Wires the checkout facade, the order service and the admin board over one
/// event store.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
    catalog: Catalog,
    clock: Arc<dyn Clock>,
) -> (Arc<AppState<S>>, Arc<ProjectionProcessor<S>>) {
    let checkout = Checkout::new(
        PricingEngine::new(config.pricing),
        Arc::new(catalog.vouchers),
        Arc::new(catalog.flash_sales),
        Arc::clone(&clock),
    );

    let order_service = OrderService::new(
        event_store.clone(),
        Arc::new(InMemoryOrderCodeRegistry::new()),
        clock,
    )
    .with_policy(config.transition)
    .with_pricing(config.pricing);

    let order_board = OrderBoardView::new();

    let mut processor = ProjectionProcessor::new(event_store);
    processor.register(Box::new(order_board.clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        checkout,
        order_service,
        order_board,
        projection_processor: processor.clone(),
    });

    (state, processor)
}
