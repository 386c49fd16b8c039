//! Checkout pricing.
//!
//! Turns a cart snapshot into a [`PricedOrder`]:
//!
//! ```text
//! subtotal  = Σ effective_unit_price × quantity
//! shipping  = 0 for pickup, 0 for delivery when subtotal >= threshold, flat fee otherwise
//! discount  = min(voucher amount, subtotal)
//! total     = subtotal - discount + shipping
//! ```
//!
//! Everything here is pure. The cart arrives as an argument; nothing is read
//! from shared state.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flash_sale::{FlashSale, best_running_sale};
use crate::primitives::{Money, ProductId, Quantity};
use crate::voucher::{VoucherCode, VoucherDiscount};

/// Fee charged for delivery below the free-shipping threshold.
pub const DEFAULT_FLAT_SHIPPING_FEE: Money = Money::new(10_000);

/// Subtotal from which delivery is free.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Money = Money::new(50_000);

/// Input constraint violations. These are reported, never defaulted away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("negative price for product {product_id}")]
    NegativePrice { product_id: ProductId },

    #[error("discounted price exceeds unit price for product {product_id}")]
    DiscountAboveUnitPrice { product_id: ProductId },

    #[error("unknown delivery method: {0}")]
    UnknownDeliveryMethod(String),

    #[error("amount overflow while pricing")]
    Overflow,
}

impl PricingError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            PricingError::EmptyCart => "EMPTY_CART",
            PricingError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            PricingError::NegativePrice { .. } => "NEGATIVE_PRICE",
            PricingError::DiscountAboveUnitPrice { .. } => "INVALID_DISCOUNTED_PRICE",
            PricingError::UnknownDeliveryMethod(_) => "UNKNOWN_DELIVERY_METHOD",
            PricingError::Overflow => "AMOUNT_OVERFLOW",
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryMethod {
    Delivery,
    Pickup,
}

impl FromStr for DeliveryMethod {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(DeliveryMethod::Delivery),
            "pickup" => Ok(DeliveryMethod::Pickup),
            other => Err(PricingError::UnknownDeliveryMethod(other.to_string())),
        }
    }
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub unit_price: Money,
    #[serde(default)]
    pub discounted_unit_price: Option<Money>,
    pub quantity: Quantity,
}

impl CartLine {
    /// Builds a line from raw input, rejecting non-positive quantities and
    /// negative prices.
    pub fn new(
        product_id: impl Into<ProductId>,
        unit_price: Money,
        quantity: i64,
    ) -> Result<Self, PricingError> {
        let product_id = product_id.into();
        let Some(qty) = Quantity::from_signed(quantity) else {
            return Err(PricingError::InvalidQuantity {
                product_id,
                quantity,
            });
        };
        let line = Self {
            product_id,
            unit_price,
            discounted_unit_price: None,
            quantity: qty,
        };
        line.check()?;
        Ok(line)
    }

    /// Sets a discounted unit price, which must not exceed the unit price.
    pub fn with_discounted_price(mut self, price: Money) -> Result<Self, PricingError> {
        self.discounted_unit_price = Some(price);
        self.check()?;
        Ok(self)
    }

    /// The price actually charged per unit.
    pub fn effective_unit_price(&self) -> Money {
        self.discounted_unit_price.unwrap_or(self.unit_price)
    }

    /// `effective_unit_price × quantity`.
    pub fn line_total(&self) -> Result<Money, PricingError> {
        self.effective_unit_price()
            .checked_mul(self.quantity)
            .ok_or(PricingError::Overflow)
    }

    fn check(&self) -> Result<(), PricingError> {
        if self.unit_price.is_negative() {
            return Err(PricingError::NegativePrice {
                product_id: self.product_id.clone(),
            });
        }
        if let Some(discounted) = self.discounted_unit_price {
            if discounted.is_negative() {
                return Err(PricingError::NegativePrice {
                    product_id: self.product_id.clone(),
                });
            }
            if discounted > self.unit_price {
                return Err(PricingError::DiscountAboveUnitPrice {
                    product_id: self.product_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The priced checkout snapshot attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOrder {
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub applied_voucher_code: Option<VoucherCode>,
}

impl PricedOrder {
    /// Returns true if `total = subtotal - discount + shipping`, nothing is
    /// negative and the discount does not exceed the subtotal.
    pub fn is_consistent(&self) -> bool {
        let no_negatives = !self.subtotal.is_negative()
            && !self.shipping_fee.is_negative()
            && !self.discount_amount.is_negative()
            && !self.total.is_negative();
        let recomputed = self
            .subtotal
            .checked_sub(self.discount_amount)
            .and_then(|m| m.checked_add(self.shipping_fee));
        no_negatives && self.discount_amount <= self.subtotal && recomputed == Some(self.total)
    }
}

/// Shop-wide pricing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub flat_shipping_fee: Money,
    pub free_shipping_threshold: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            flat_shipping_fee: DEFAULT_FLAT_SHIPPING_FEE,
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
        }
    }
}

/// Computes checkout totals from a cart snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Exact integer subtotal of the cart.
    pub fn subtotal(&self, lines: &[CartLine]) -> Result<Money, PricingError> {
        lines.iter().try_fold(Money::zero(), |acc, line| {
            line.check()?;
            acc.checked_add(line.line_total()?)
                .ok_or(PricingError::Overflow)
        })
    }

    /// Shipping fee for a given subtotal. The free-shipping threshold is
    /// inclusive.
    pub fn shipping_fee(&self, subtotal: Money, delivery: DeliveryMethod) -> Money {
        match delivery {
            DeliveryMethod::Pickup => Money::zero(),
            DeliveryMethod::Delivery if subtotal >= self.config.free_shipping_threshold => {
                Money::zero()
            }
            DeliveryMethod::Delivery => self.config.flat_shipping_fee,
        }
    }

    /// Prices a cart. An empty cart prices to zero; callers that require
    /// items reject it themselves.
    pub fn price(
        &self,
        lines: &[CartLine],
        delivery: DeliveryMethod,
        voucher: Option<&VoucherDiscount>,
    ) -> Result<PricedOrder, PricingError> {
        let subtotal = self.subtotal(lines)?;
        let shipping_fee = self.shipping_fee(subtotal, delivery);

        let discount_amount = voucher
            .map(|v| v.amount.max(Money::zero()))
            .unwrap_or_default()
            .min(subtotal);

        let total = subtotal
            .checked_sub(discount_amount)
            .and_then(|m| m.checked_add(shipping_fee))
            .ok_or(PricingError::Overflow)?;

        Ok(PricedOrder {
            subtotal,
            shipping_fee,
            discount_amount,
            total,
            applied_voucher_code: voucher.map(|v| v.code.clone()),
        })
    }
}

/// Returns the cart with running flash-sale prices applied.
///
/// A line only changes when the best running sale beats the price it already
/// carries.
pub fn apply_flash_sales<'a>(
    lines: &[CartLine],
    sales: impl IntoIterator<Item = &'a FlashSale> + Clone,
    now: DateTime<Utc>,
) -> Vec<CartLine> {
    lines
        .iter()
        .map(|line| {
            let mut line = line.clone();
            if let Some((_, sale_price)) =
                best_running_sale(sales.clone(), &line.product_id, line.unit_price, now)
                && sale_price < line.effective_unit_price()
            {
                line.discounted_unit_price = Some(sale_price);
            }
            line
        })
        .collect()
}
