//! Requests an order accepts: placement and status transitions.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::pricing::{CartLine, DeliveryMethod, PricedOrder};

use super::{Actor, CustomerInfo, FulfillmentStatus, PaymentMethod, PaymentStatus};

/// Command to commit a priced checkout as an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    /// The order ID to create.
    pub order_id: AggregateId,

    pub customer: CustomerInfo,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub lines: Vec<CartLine>,

    /// The snapshot returned by checkout pricing.
    pub priced: PricedOrder,
}

impl PlaceOrder {
    pub fn new(
        order_id: AggregateId,
        customer: CustomerInfo,
        delivery_method: DeliveryMethod,
        payment_method: PaymentMethod,
        lines: Vec<CartLine>,
        priced: PricedOrder,
    ) -> Self {
        Self {
            order_id,
            customer,
            delivery_method,
            payment_method,
            lines,
            priced,
        }
    }

    /// Same as [`PlaceOrder::new`] with a generated order ID.
    pub fn for_checkout(
        customer: CustomerInfo,
        delivery_method: DeliveryMethod,
        payment_method: PaymentMethod,
        lines: Vec<CartLine>,
        priced: PricedOrder,
    ) -> Self {
        Self::new(
            AggregateId::new(),
            customer,
            delivery_method,
            payment_method,
            lines,
            priced,
        )
    }
}

/// Command to move an order on one or both status axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTransition {
    pub order_id: AggregateId,

    #[serde(default)]
    pub fulfillment: Option<FulfillmentStatus>,

    #[serde(default)]
    pub payment: Option<PaymentStatus>,

    /// Version the caller last saw. When set, any intervening change is a
    /// conflict.
    #[serde(default)]
    pub expected_version: Option<Version>,

    pub actor: Actor,

    #[serde(default)]
    pub reason: Option<String>,
}

impl RequestTransition {
    /// Creates an empty request; add at least one axis before sending it.
    pub fn new(order_id: AggregateId, actor: Actor) -> Self {
        Self {
            order_id,
            fulfillment: None,
            payment: None,
            expected_version: None,
            actor,
            reason: None,
        }
    }

    pub fn fulfillment(mut self, to: FulfillmentStatus) -> Self {
        self.fulfillment = Some(to);
        self
    }

    pub fn payment(mut self, to: PaymentStatus) -> Self {
        self.payment = Some(to);
        self
    }

    pub fn expect_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns true if the statuses this request touches differ between the
    /// two snapshots.
    pub fn touches_changed_axis(
        &self,
        before: (FulfillmentStatus, PaymentStatus),
        after: (FulfillmentStatus, PaymentStatus),
    ) -> bool {
        (self.fulfillment.is_some() && before.0 != after.0)
            || (self.payment.is_some() && before.1 != after.1)
    }
}
