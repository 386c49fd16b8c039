//! Admin order board: every order grouped by fulfillment status.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{
    DeliveryMethod, FulfillmentStatus, Money, OrderEvent, PaymentMethod, PaymentStatus,
};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::error::ProjectionError;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One row on the order board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub order_code: String,
    pub customer_name: String,
    pub phone: String,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub fulfillment: FulfillmentStatus,
    pub payment: PaymentStatus,
    pub item_count: usize,
    pub total: Money,
    pub refund_due: bool,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Board {
    orders: HashMap<AggregateId, OrderSummary>,
    by_code: HashMap<String, AggregateId>,
}

/// Read model behind the admin order list.
#[derive(Clone, Default)]
pub struct OrderBoardView {
    board: Arc<RwLock<Board>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl OrderBoardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.board.read().await.orders.get(&order_id).cloned()
    }

    /// Looks an order up by code, ignoring case.
    pub async fn get_by_code(&self, code: &str) -> Option<OrderSummary> {
        let code = code.trim().to_ascii_uppercase();
        let board = self.board.read().await;
        let order_id = board.by_code.get(&code)?;
        board.orders.get(order_id).cloned()
    }

    /// Orders in `status`, or all orders when `None`, newest first.
    pub async fn list(&self, status: Option<FulfillmentStatus>) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self
            .board
            .read()
            .await
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.fulfillment == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| a.order_code.cmp(&b.order_code))
        });
        orders
    }

    /// Number of orders per fulfillment status. Every status is present.
    pub async fn counts_by_status(&self) -> HashMap<FulfillmentStatus, usize> {
        let mut counts: HashMap<_, _> = FulfillmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for order in self.board.read().await.orders.values() {
            *counts.entry(order.fulfillment).or_default() += 1;
        }
        counts
    }

    /// Paid orders that were cancelled and still need a refund.
    pub async fn refunds_due(&self) -> Vec<OrderSummary> {
        self.board
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.refund_due)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Projection for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Order" {
            let order_event: OrderEvent = serde_json::from_value(event.payload.clone())?;
            let order_id = event.aggregate_id;
            let mut board = self.board.write().await;

            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    board
                        .by_code
                        .insert(data.order_code.to_string(), order_id);
                    board.orders.insert(
                        order_id,
                        OrderSummary {
                            order_id,
                            order_code: data.order_code.to_string(),
                            customer_name: data.customer.name,
                            phone: data.customer.phone,
                            delivery_method: data.delivery_method,
                            payment_method: data.payment_method,
                            fulfillment: FulfillmentStatus::Pending,
                            payment: PaymentStatus::Unpaid,
                            item_count: data.lines.len(),
                            total: data.priced.total,
                            refund_due: false,
                            placed_at: data.placed_at,
                            updated_at: data.placed_at,
                        },
                    );
                }
                OrderEvent::FulfillmentStatusChanged(data) => {
                    let order = board
                        .orders
                        .get_mut(&order_id)
                        .ok_or(ProjectionError::UnknownOrder(order_id))?;
                    order.fulfillment = data.to;
                    order.refund_due |= data.refund_due;
                    order.updated_at = data.changed_at;
                }
                OrderEvent::PaymentStatusChanged(data) => {
                    let order = board
                        .orders
                        .get_mut(&order_id)
                        .ok_or(ProjectionError::UnknownOrder(order_id))?;
                    order.payment = data.to;
                    order.refund_due |= data.refund_due;
                    order.updated_at = data.changed_at;
                }
            }
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        *self.board.write().await = Board::default();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    fn count(&self) -> usize {
        // try_read so a held write lock reads as empty instead of blocking
        self.board.try_read().map(|b| b.orders.len()).unwrap_or(0)
    }
}
