//! Order aggregate and related types.

mod aggregate;
mod code;
mod commands;
mod events;
mod service;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use code::{
    InMemoryOrderCodeRegistry, ORDER_CODE_ALPHABET, ORDER_CODE_LEN, OrderCode, OrderCodeRegistry,
};
pub use commands::{PlaceOrder, RequestTransition};
pub use events::{
    FulfillmentStatusChangedData, OrderEvent, OrderPlacedData, PaymentStatusChangedData,
};
pub use service::{
    MAX_ORDER_CODE_ATTEMPTS, OrderService, TransitionOutcome, TransitionPolicy,
};
pub use status::{FulfillmentStatus, PaymentStatus, UnknownStatus, next_fulfillment_states};
pub use value_objects::{Actor, CustomerInfo, PaymentMethod};

use thiserror::Error;

use crate::pricing::PricingError;

/// A status change the transition table does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The order has not been placed.
    #[error("Order has not been placed")]
    NotPlaced,

    /// Neither axis was requested.
    #[error("Transition requests no status change")]
    EmptyTransition,

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },

    #[error("Illegal payment transition: {from} -> {to}")]
    IllegalPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

impl TransitionError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            TransitionError::NotPlaced => "ORDER_NOT_PLACED",
            TransitionError::EmptyTransition => "EMPTY_TRANSITION",
            TransitionError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            TransitionError::IllegalPaymentTransition { .. } => "ILLEGAL_PAYMENT_TRANSITION",
        }
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order is already placed.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// A required customer field is blank.
    #[error("Customer {0} is required")]
    MissingCustomerField(&'static str),

    /// The priced snapshot does not add up or does not match the lines.
    #[error("Priced total does not match the order lines")]
    PricedTotalMismatch,

    #[error("Invalid order lines: {0}")]
    InvalidLines(PricingError),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl OrderError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::AlreadyPlaced => "ORDER_ALREADY_PLACED",
            OrderError::NoItems => "ORDER_NO_ITEMS",
            OrderError::MissingCustomerField(_) => "MISSING_CUSTOMER_FIELD",
            OrderError::PricedTotalMismatch => "PRICED_TOTAL_MISMATCH",
            OrderError::InvalidLines(e) => e.code(),
            OrderError::UnknownPaymentMethod(_) => "UNKNOWN_PAYMENT_METHOD",
            OrderError::Transition(e) => e.code(),
        }
    }

    /// Input errors are malformed requests; the rest are business rejections.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            OrderError::NoItems
                | OrderError::MissingCustomerField(_)
                | OrderError::InvalidLines(_)
                | OrderError::UnknownPaymentMethod(_)
                | OrderError::Transition(TransitionError::EmptyTransition)
        )
    }
}
