//! HTTP surface for the storefront core.
//!
//! Exposes checkout pricing, order commit, admin transitions and the order
//! board over REST, with structured logging (tracing) and Prometheus metrics.

pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use catalog::{Catalog, CatalogError};
pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::{AppState, create_state};

/// Customer-facing routes: quoting a cart, watching a sale, placing and
/// tracking an order.
fn storefront_routes<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/checkout/price", post(routes::checkout::price::<S>))
        .route("/flash-sales/{id}", get(routes::checkout::flash_sale::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/by-code/{code}", get(routes::orders::get_by_code::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
}

/// Back-office routes: the order board, transitions and the audit trail.
fn admin_routes<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/admin/orders", get(routes::admin::list_orders::<S>))
        .route("/orders/{id}/transition", post(routes::orders::transition::<S>))
        .route("/orders/{id}/events", get(routes::orders::events::<S>))
}

/// Builds the full router over shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .merge(storefront_routes())
        .merge(admin_routes())
        .with_state(state)
        .merge(metrics)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
