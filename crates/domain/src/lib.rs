//! Storefront core: checkout pricing, promotions and the order lifecycle.
//!
//! - Money/quantity primitives with integral, checked arithmetic
//! - Voucher validation and flash-sale window evaluation
//! - The pricing engine and the checkout facade built on it
//! - The event-sourced order aggregate with its dual-axis status table
//! - `OrderService`, the single writer of order state

pub mod aggregate;
pub mod checkout;
pub mod command;
pub mod error;
pub mod flash_sale;
pub mod order;
pub mod pricing;
pub mod primitives;
pub mod voucher;

pub use aggregate::{Aggregate, DomainEvent};
pub use checkout::{Checkout, CheckoutError, CheckoutQuote};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use flash_sale::{
    FlashSale, FlashSaleCatalog, FlashSaleError, FlashSaleEvaluator, FlashSaleId, SaleDiscount,
    SaleSnapshot, SaleStatus, TimeRemaining,
};
pub use order::{
    Actor, CustomerInfo, FulfillmentStatus, InMemoryOrderCodeRegistry, Order, OrderCode,
    OrderCodeRegistry, OrderError, OrderEvent, OrderService, PaymentMethod, PaymentStatus,
    PlaceOrder, RequestTransition, TransitionError, TransitionOutcome, TransitionPolicy,
    next_fulfillment_states,
};
pub use pricing::{
    CartLine, DeliveryMethod, PricedOrder, PricingConfig, PricingEngine, PricingError,
    apply_flash_sales,
};
pub use primitives::{Money, ProductId, Quantity};
pub use voucher::{
    Voucher, VoucherCatalog, VoucherCode, VoucherDiscount, VoucherIssueError, VoucherRejection,
};
