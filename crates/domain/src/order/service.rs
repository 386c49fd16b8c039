//! Order service: commits priced checkouts and applies status transitions.

use std::sync::Arc;
use std::time::Duration;

use common::{AggregateId, Clock};
use event_store::{EventEnvelope, EventStore, Version};

use crate::aggregate::Aggregate;
use crate::command::{CommandHandler, CommandResult, DEFAULT_STORE_TIMEOUT};
use crate::error::DomainError;
use crate::pricing::{PricingConfig, PricingEngine};

use super::{
    FulfillmentStatus, Order, OrderCode, OrderCodeRegistry, OrderError, OrderEvent, PaymentStatus,
    PlaceOrder, RequestTransition,
};

/// How many generated codes to try before giving up.
pub const MAX_ORDER_CODE_ATTEMPTS: u32 = 5;

/// Bounds on the conflict-retry loop of [`OrderService::request_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// No new attempt starts after this much time has passed.
    pub retry_deadline: Duration,

    /// Bound on every individual store call.
    pub store_timeout: Duration,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_deadline: Duration::from_secs(2),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Result of a transition request.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The order after the transition.
    pub order: Order,

    /// False when the request was a no-op (e.g. marking a paid order paid).
    pub changed: bool,

    /// True when this transition cancelled a paid order.
    pub refund_due: bool,

    pub version: Version,

    /// Events appended by this request.
    pub events: Vec<OrderEvent>,
}

/// Status snapshot taken the first time a request is validated.
#[derive(Debug, Clone, Copy)]
struct Observed {
    version: Version,
    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,
}

/// Service for managing orders.
///
/// The only writer of order state. Transitions on one order are linearized
/// through optimistic versioning; transitions on different orders never
/// wait on each other.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
    codes: Arc<dyn OrderCodeRegistry>,
    clock: Arc<dyn Clock>,
    policy: TransitionPolicy,
    pricing: PricingEngine,
    generate_code: fn() -> OrderCode,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the default transition policy.
    pub fn new(store: S, codes: Arc<dyn OrderCodeRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            codes,
            clock,
            policy: TransitionPolicy::default(),
            pricing: PricingEngine::default(),
            generate_code: OrderCode::generate,
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.handler = self.handler.with_store_timeout(policy.store_timeout);
        self.policy = policy;
        self
    }

    /// Shipping fees on committed snapshots are checked against this schedule.
    pub fn with_pricing(mut self, config: PricingConfig) -> Self {
        self.pricing = PricingEngine::new(config);
        self
    }

    /// Replaces the order-code generator.
    pub fn with_code_generator(mut self, generate: fn() -> OrderCode) -> Self {
        self.generate_code = generate;
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// Commits a priced checkout as a new `Pending`/`Unpaid` order.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn commit_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>, DomainError> {
        let order = self.handler.load(cmd.order_id).await?;
        if let Err(e) = order
            .validate_placement(&cmd)
            .and_then(|()| self.check_shipping(&cmd))
        {
            tracing::debug!(reason = e.code(), "Order rejected");
            return Err(e.into());
        }

        let code = self.reserve_code(cmd.order_id).await?;
        let now = self.clock.now();
        let events = order.place(&cmd, code.clone(), now)?;

        match self.handler.commit(cmd.order_id, order, events, now).await {
            Ok(result) => {
                metrics::counter!("orders_committed_total").increment(1);
                tracing::info!(order_code = %code, total = %cmd.priced.total, "Order committed");
                Ok(result)
            }
            Err(e) => {
                if let Err(release_err) = self.handler.guarded(self.codes.release(&code)).await {
                    tracing::warn!(order_code = %code, error = %release_err, "Failed to release order code");
                }
                Err(e)
            }
        }
    }

    /// The snapshot's shipping fee must be what this shop charges for its
    /// subtotal and delivery method.
    fn check_shipping(&self, cmd: &PlaceOrder) -> Result<(), OrderError> {
        let expected = self
            .pricing
            .shipping_fee(cmd.priced.subtotal, cmd.delivery_method);
        if cmd.priced.shipping_fee == expected {
            Ok(())
        } else {
            Err(OrderError::PricedTotalMismatch)
        }
    }

    async fn reserve_code(&self, order_id: AggregateId) -> Result<OrderCode, DomainError> {
        for attempt in 1..=MAX_ORDER_CODE_ATTEMPTS {
            let code = (self.generate_code)();
            if self
                .handler
                .guarded(self.codes.reserve(&code, order_id))
                .await?
            {
                return Ok(code);
            }
            tracing::debug!(order_code = %code, attempt, "Order code already taken");
        }

        tracing::error!(
            attempts = MAX_ORDER_CODE_ATTEMPTS,
            "Could not find a free order code"
        );
        Err(DomainError::OrderCodeExhausted {
            attempts: MAX_ORDER_CODE_ATTEMPTS,
        })
    }

    /// Moves an order along one or both status axes.
    ///
    /// With `expected_version` set, any change since the caller's read is a
    /// conflict. Without it, a lost append race is retried as long as the
    /// axis this request touches is unchanged and the policy allows another
    /// attempt.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, actor = %cmd.actor))]
    pub async fn request_transition(
        &self,
        cmd: RequestTransition,
    ) -> Result<TransitionOutcome, DomainError> {
        let started = tokio::time::Instant::now();
        let mut observed: Option<Observed> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let order = self
                .handler
                .load_existing(cmd.order_id)
                .await?
                .ok_or(DomainError::OrderNotFound(cmd.order_id))?;

            if let Some(expected) = cmd.expected_version
                && order.version() != expected
            {
                return Err(self.conflict(cmd.order_id, expected, order.version()));
            }

            if let Some(first) = observed
                && cmd.touches_changed_axis(
                    (first.fulfillment, first.payment),
                    (order.fulfillment_status(), order.payment_status()),
                )
            {
                return Err(self.conflict(cmd.order_id, first.version, order.version()));
            }

            observed.get_or_insert(Observed {
                version: order.version(),
                fulfillment: order.fulfillment_status(),
                payment: order.payment_status(),
            });

            let now = self.clock.now();
            let events = match order.transition(&cmd, now) {
                Ok(events) => events,
                Err(e) => {
                    tracing::debug!(reason = e.code(), "Transition rejected");
                    return Err(e.into());
                }
            };

            if events.is_empty() {
                return Ok(TransitionOutcome {
                    version: order.version(),
                    order,
                    changed: false,
                    refund_due: false,
                    events,
                });
            }

            let refund_due = events.iter().any(|event| match event {
                OrderEvent::FulfillmentStatusChanged(data) => data.refund_due,
                OrderEvent::PaymentStatusChanged(data) => data.refund_due,
                OrderEvent::OrderPlaced(_) => false,
            });

            match self.handler.commit(cmd.order_id, order, events, now).await {
                Ok(result) => {
                    metrics::counter!("order_transitions_total").increment(1);
                    tracing::info!(
                        fulfillment = %result.aggregate.fulfillment_status(),
                        payment = %result.aggregate.payment_status(),
                        version = %result.new_version,
                        refund_due,
                        "Order transitioned"
                    );
                    return Ok(TransitionOutcome {
                        order: result.aggregate,
                        changed: true,
                        refund_due,
                        version: result.new_version,
                        events: result.events,
                    });
                }
                Err(DomainError::Conflict {
                    expected, actual, ..
                }) => {
                    let may_retry = cmd.expected_version.is_none()
                        && attempt < self.policy.max_attempts
                        && started.elapsed() < self.policy.retry_deadline;
                    if !may_retry {
                        return Err(self.conflict(cmd.order_id, expected, actual));
                    }
                    tracing::warn!(attempt, %expected, %actual, "Append conflict, re-reading order");
                }
                Err(e) => {
                    if matches!(e, DomainError::StoreUnavailable(_)) {
                        tracing::error!(error = %e, "Transition failed");
                    }
                    return Err(e);
                }
            }
        }
    }

    fn conflict(&self, aggregate_id: AggregateId, expected: Version, actual: Version) -> DomainError {
        metrics::counter!("order_transition_conflicts_total").increment(1);
        tracing::warn!(%expected, %actual, "Order transition conflict");
        DomainError::Conflict {
            aggregate_id,
            expected,
            actual,
        }
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Loads an order by its human-readable code. Malformed codes find
    /// nothing.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_code(&self, raw_code: &str) -> Result<Option<Order>, DomainError> {
        let Some(code) = OrderCode::parse(raw_code) else {
            return Ok(None);
        };
        match self.handler.guarded(self.codes.lookup(&code)).await? {
            Some(order_id) => self.get_order(order_id).await,
            None => Ok(None),
        }
    }

    /// The stored audit trail of one order.
    #[tracing::instrument(skip(self))]
    pub async fn order_events(&self, order_id: AggregateId) -> Result<Vec<EventEnvelope>, DomainError> {
        let events = self.handler.events(order_id).await?;
        if events.is_empty() {
            return Err(DomainError::OrderNotFound(order_id));
        }
        Ok(events)
    }
}
