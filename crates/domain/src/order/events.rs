//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::pricing::{CartLine, DeliveryMethod, PricedOrder};

use super::{Actor, CustomerInfo, FulfillmentStatus, OrderCode, PaymentMethod, PaymentStatus};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was committed from a priced checkout.
    OrderPlaced(OrderPlacedData),

    /// Fulfillment status moved along the transition table.
    FulfillmentStatusChanged(FulfillmentStatusChangedData),

    /// Payment was recorded.
    PaymentStatusChanged(PaymentStatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::FulfillmentStatusChanged(_) => "FulfillmentStatusChanged",
            OrderEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub order_code: OrderCode,
    pub customer: CustomerInfo,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,

    /// Line snapshot as priced. Never changes after placement.
    pub lines: Vec<CartLine>,
    pub priced: PricedOrder,
    pub placed_at: DateTime<Utc>,
}

/// Data for FulfillmentStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentStatusChangedData {
    pub from: FulfillmentStatus,
    pub to: FulfillmentStatus,

    /// Set when a paid order is cancelled. The refund itself is handled
    /// outside the order.
    #[serde(default)]
    pub refund_due: bool,
    pub actor: Actor,
    #[serde(default)]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Data for PaymentStatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,

    /// Set when payment lands on an order that is already cancelled.
    #[serde(default)]
    pub refund_due: bool,
    pub actor: Actor,
    #[serde(default)]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let event = OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from: PaymentStatus::Unpaid,
            to: PaymentStatus::Paid,
            refund_due: false,
            actor: Actor::Admin,
            reason: None,
            changed_at: Utc::now(),
        });
        assert_eq!(event.event_type(), "PaymentStatusChanged");
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = OrderEvent::FulfillmentStatusChanged(FulfillmentStatusChangedData {
            from: FulfillmentStatus::Confirmed,
            to: FulfillmentStatus::Cancelled,
            refund_due: true,
            actor: Actor::Customer,
            reason: Some("đặt nhầm".to_string()),
            changed_at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FulfillmentStatusChanged");
        assert_eq!(json["data"]["from"], "Confirmed");
        assert_eq!(json["data"]["to"], "Cancelled");
        assert_eq!(json["data"]["refund_due"], true);

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
