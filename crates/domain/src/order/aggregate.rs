//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::pricing::{CartLine, DeliveryMethod, PricedOrder, PricingEngine};

use super::{
    CustomerInfo, FulfillmentStatus, OrderCode, OrderError, OrderEvent, PaymentMethod,
    PaymentStatus, PlaceOrder, RequestTransition, TransitionError,
    events::{FulfillmentStatusChangedData, OrderPlacedData, PaymentStatusChangedData},
};

/// Order aggregate root.
///
/// Created from a priced checkout, then moved along the fulfillment and
/// payment axes one transition at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    code: Option<OrderCode>,
    customer: Option<CustomerInfo>,
    delivery_method: Option<DeliveryMethod>,
    payment_method: PaymentMethod,
    lines: Vec<CartLine>,
    priced: Option<PricedOrder>,
    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,

    /// Set once an order is both cancelled and paid, in either order.
    refund_due: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => {
                self.id = Some(data.order_id);
                self.code = Some(data.order_code);
                self.customer = Some(data.customer);
                self.delivery_method = Some(data.delivery_method);
                self.payment_method = data.payment_method;
                self.lines = data.lines;
                self.priced = Some(data.priced);
                self.fulfillment = FulfillmentStatus::Pending;
                self.payment = PaymentStatus::Unpaid;
                self.created_at = Some(data.placed_at);
                self.updated_at = Some(data.placed_at);
            }
            OrderEvent::FulfillmentStatusChanged(data) => {
                self.fulfillment = data.to;
                self.refund_due |= data.refund_due;
                self.updated_at = Some(data.changed_at);
            }
            OrderEvent::PaymentStatusChanged(data) => {
                self.payment = data.to;
                self.refund_due |= data.refund_due;
                self.updated_at = Some(data.changed_at);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn code(&self) -> Option<&OrderCode> {
        self.code.as_ref()
    }

    pub fn customer(&self) -> Option<&CustomerInfo> {
        self.customer.as_ref()
    }

    pub fn delivery_method(&self) -> Option<DeliveryMethod> {
        self.delivery_method
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// The line snapshot taken at checkout.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn priced(&self) -> Option<&PricedOrder> {
        self.priced.as_ref()
    }

    pub fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment
    }

    /// True once the order is cancelled and paid, whichever came first.
    pub fn refund_due(&self) -> bool {
        self.refund_due
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_placed(&self) -> bool {
        self.id.is_some()
    }

    /// Returns true if the fulfillment axis can no longer move.
    pub fn is_terminal(&self) -> bool {
        self.fulfillment.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Checks a placement request without generating a code.
    pub fn validate_placement(&self, cmd: &PlaceOrder) -> Result<(), OrderError> {
        if self.is_placed() {
            return Err(OrderError::AlreadyPlaced);
        }

        if cmd.lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        cmd.customer.validate(cmd.delivery_method)?;

        let subtotal = PricingEngine::default()
            .subtotal(&cmd.lines)
            .map_err(OrderError::InvalidLines)?;
        if subtotal != cmd.priced.subtotal || !cmd.priced.is_consistent() {
            return Err(OrderError::PricedTotalMismatch);
        }

        // Pickup never ships, whatever the shop's fee schedule.
        if cmd.delivery_method == DeliveryMethod::Pickup && !cmd.priced.shipping_fee.is_zero() {
            return Err(OrderError::PricedTotalMismatch);
        }

        Ok(())
    }

    /// Places the order under `code`.
    pub fn place(
        &self,
        cmd: &PlaceOrder,
        code: OrderCode,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.validate_placement(cmd)?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            order_code: code,
            customer: cmd.customer.clone(),
            delivery_method: cmd.delivery_method,
            payment_method: cmd.payment_method,
            lines: cmd.lines.clone(),
            priced: cmd.priced.clone(),
            placed_at: now,
        })])
    }

    /// Validates a transition request against the current snapshot.
    ///
    /// Both axes are checked before any event is produced, so a request that
    /// fails on one axis changes nothing. An empty result means the request
    /// was a payment no-op.
    pub fn transition(
        &self,
        request: &RequestTransition,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, TransitionError> {
        if !self.is_placed() {
            return Err(TransitionError::NotPlaced);
        }

        if request.fulfillment.is_none() && request.payment.is_none() {
            return Err(TransitionError::EmptyTransition);
        }

        let payment_change = match request.payment {
            Some(to) => self.payment_change(to)?,
            None => None,
        };

        if let Some(to) = request.fulfillment
            && !self.fulfillment.can_transition_to(to)
        {
            return Err(TransitionError::IllegalTransition {
                from: self.fulfillment,
                to,
            });
        }

        let mut events = Vec::with_capacity(2);
        let payment_after = payment_change.unwrap_or(self.payment);

        if let Some(to) = payment_change {
            // Money taken after cancellation has to go back.
            let paid_after_cancel = self.fulfillment == FulfillmentStatus::Cancelled
                && to == PaymentStatus::Paid;
            events.push(OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
                from: self.payment,
                to,
                refund_due: paid_after_cancel,
                actor: request.actor,
                reason: request.reason.clone(),
                changed_at: now,
            }));
        }

        if let Some(to) = request.fulfillment {
            events.push(OrderEvent::FulfillmentStatusChanged(
                FulfillmentStatusChangedData {
                    from: self.fulfillment,
                    to,
                    refund_due: to == FulfillmentStatus::Cancelled
                        && payment_after == PaymentStatus::Paid,
                    actor: request.actor,
                    reason: request.reason.clone(),
                    changed_at: now,
                },
            ));
        }

        Ok(events)
    }

    /// Returns the new payment status, or None for a no-op.
    fn payment_change(&self, to: PaymentStatus) -> Result<Option<PaymentStatus>, TransitionError> {
        match (self.payment, to) {
            (PaymentStatus::Unpaid, PaymentStatus::Paid) => Ok(Some(PaymentStatus::Paid)),
            (from, to) if from == to => Ok(None),
            (from, to) => Err(TransitionError::IllegalPaymentTransition { from, to }),
        }
    }
}
