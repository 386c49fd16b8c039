//! Flash-sale windows.
//!
//! A sale is *running* while it is enabled and `start_at <= now <= end_at`.
//! Both ends of the window are inclusive, so at exactly `end_at` the sale is
//! still running with zero seconds left. Classification always takes `now` as
//! an argument; [`FlashSaleEvaluator`] reads its clock on every call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::Clock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::{Money, ProductId};

/// Identifier of a flash sale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashSaleId(String);

impl FlashSaleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlashSaleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a sale reduces the unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "discount_type", content = "discount_value")]
pub enum SaleDiscount {
    /// Whole percent off, 0..=100.
    Percent(u32),
    /// Fixed amount off each unit.
    Fixed(Money),
}

/// A time-boxed promotion on a set of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashSale {
    pub id: FlashSaleId,
    pub discount: SaleDiscount,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub enabled: bool,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
}

/// Problems with a sale definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashSaleError {
    #[error("flash sale {id} ends before it starts")]
    InvalidWindow { id: FlashSaleId },

    #[error("flash sale {id} has an out-of-range discount")]
    InvalidDiscount { id: FlashSaleId },

    #[error("flash sale {0} is defined twice")]
    DuplicateId(FlashSaleId),
}

impl FlashSale {
    /// Creates an enabled sale, checking the window and discount.
    pub fn new(
        id: impl Into<String>,
        discount: SaleDiscount,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        product_ids: impl IntoIterator<Item = ProductId>,
    ) -> Result<Self, FlashSaleError> {
        let sale = Self {
            id: FlashSaleId::new(id),
            discount,
            start_at,
            end_at,
            enabled: true,
            product_ids: product_ids.into_iter().collect(),
        };
        sale.check()?;
        Ok(sale)
    }

    /// Returns a copy with the enable flag set.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn check(&self) -> Result<(), FlashSaleError> {
        if self.end_at < self.start_at {
            return Err(FlashSaleError::InvalidWindow {
                id: self.id.clone(),
            });
        }
        let discount_ok = match self.discount {
            SaleDiscount::Percent(p) => p <= 100,
            SaleDiscount::Fixed(amount) => !amount.is_negative(),
        };
        if !discount_ok {
            return Err(FlashSaleError::InvalidDiscount {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Returns true if the sale covers `product`.
    pub fn targets(&self, product: &ProductId) -> bool {
        self.product_ids.iter().any(|p| p == product)
    }

    /// Unit price after this sale's discount, never below zero.
    pub fn discounted_price(&self, unit_price: Money) -> Money {
        let off = match self.discount {
            SaleDiscount::Percent(p) => {
                let off = i128::from(unit_price.units()) * i128::from(p.min(100)) / 100;
                Money::new(i64::try_from(off).unwrap_or(i64::MAX))
            }
            SaleDiscount::Fixed(amount) => amount,
        };
        unit_price.saturating_sub_to_zero(off)
    }
}

/// Where a sale sits relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleStatus {
    Scheduled,
    Running,
    Expired,
}

/// Time left on a running sale, broken down for a countdown display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub total_seconds: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeRemaining {
    fn from_seconds(total_seconds: i64) -> Self {
        Self {
            total_seconds,
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        }
    }
}

/// Status plus countdown, as polled by the storefront banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSnapshot {
    pub status: SaleStatus,
    pub remaining: Option<TimeRemaining>,
}

/// Classifies `sale` at `now`.
pub fn classify(sale: &FlashSale, now: DateTime<Utc>) -> SaleStatus {
    if !sale.enabled || now > sale.end_at {
        SaleStatus::Expired
    } else if now < sale.start_at {
        SaleStatus::Scheduled
    } else {
        SaleStatus::Running
    }
}

/// Whole seconds until `sale` ends, or `None` unless it is running.
pub fn time_remaining(sale: &FlashSale, now: DateTime<Utc>) -> Option<TimeRemaining> {
    if classify(sale, now) != SaleStatus::Running {
        return None;
    }
    // num_seconds truncates toward zero; the span is non-negative here.
    let total = (sale.end_at - now).num_seconds().max(0);
    Some(TimeRemaining::from_seconds(total))
}

/// Picks the sale that gives `product` its lowest price at `now`.
///
/// Ties go to the sale that started first, then to the smaller id, so the
/// answer does not depend on iteration order.
pub fn best_running_sale<'a>(
    sales: impl IntoIterator<Item = &'a FlashSale>,
    product: &ProductId,
    unit_price: Money,
    now: DateTime<Utc>,
) -> Option<(&'a FlashSale, Money)> {
    sales
        .into_iter()
        .filter(|sale| sale.targets(product) && classify(sale, now) == SaleStatus::Running)
        .map(|sale| (sale, sale.discounted_price(unit_price)))
        .min_by(|(a, price_a), (b, price_b)| {
            price_a
                .cmp(price_b)
                .then(a.start_at.cmp(&b.start_at))
                .then(a.id.cmp(&b.id))
        })
}

/// All known flash sales, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FlashSaleCatalog {
    sales: HashMap<FlashSaleId, FlashSale>,
}

impl FlashSaleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, rejecting invalid or duplicate sales.
    pub fn from_sales(sales: impl IntoIterator<Item = FlashSale>) -> Result<Self, FlashSaleError> {
        let mut catalog = Self::new();
        for sale in sales {
            sale.check()?;
            if catalog.sales.contains_key(&sale.id) {
                return Err(FlashSaleError::DuplicateId(sale.id));
            }
            catalog.sales.insert(sale.id.clone(), sale);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &FlashSaleId) -> Option<&FlashSale> {
        self.sales.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlashSale> + Clone {
        self.sales.values()
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}

/// Classifies sales against a live clock.
#[derive(Clone)]
pub struct FlashSaleEvaluator {
    clock: Arc<dyn Clock>,
}

impl FlashSaleEvaluator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn classify(&self, sale: &FlashSale) -> SaleStatus {
        classify(sale, self.clock.now())
    }

    pub fn time_remaining(&self, sale: &FlashSale) -> Option<TimeRemaining> {
        time_remaining(sale, self.clock.now())
    }

    /// Status and countdown from a single clock reading.
    pub fn snapshot(&self, sale: &FlashSale) -> SaleSnapshot {
        let now = self.clock.now();
        SaleSnapshot {
            status: classify(sale, now),
            remaining: time_remaining(sale, now),
        }
    }
}

impl std::fmt::Debug for FlashSaleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashSaleEvaluator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::FixedClock;

    fn sale_around(now: DateTime<Utc>, before: i64, after: i64) -> FlashSale {
        FlashSale::new(
            "fs-1",
            SaleDiscount::Percent(20),
            now - Duration::seconds(before),
            now + Duration::seconds(after),
            [ProductId::new("pho-bo")],
        )
        .unwrap()
    }

    #[test]
    fn running_inside_window() {
        let now = Utc::now();
        assert_eq!(classify(&sale_around(now, 1, 1), now), SaleStatus::Running);
    }

    #[test]
    fn scheduled_before_start() {
        let now = Utc::now();
        let sale = sale_around(now, -10, 100);
        assert_eq!(classify(&sale, now), SaleStatus::Scheduled);
        assert_eq!(time_remaining(&sale, now), None);
    }

    #[test]
    fn end_instant_is_running_with_zero_left() {
        let now = Utc::now();
        let sale = sale_around(now, 60, 0);
        assert_eq!(classify(&sale, now), SaleStatus::Running);
        assert_eq!(time_remaining(&sale, now).map(|r| r.total_seconds), Some(0));

        let after = now + Duration::nanoseconds(1);
        assert_eq!(classify(&sale, after), SaleStatus::Expired);
        assert_eq!(time_remaining(&sale, after), None);
    }

    #[test]
    fn disabled_is_expired_even_inside_window() {
        let now = Utc::now();
        let sale = sale_around(now, 1, 1).with_enabled(false);
        assert_eq!(classify(&sale, now), SaleStatus::Expired);
    }

    #[test]
    fn remaining_is_floored_and_decomposed() {
        let now = Utc::now();
        let end = now + Duration::days(1)
            + Duration::hours(2)
            + Duration::minutes(3)
            + Duration::seconds(4)
            + Duration::milliseconds(900);
        let sale = FlashSale::new("fs", SaleDiscount::Percent(10), now, end, []).unwrap();

        let remaining = time_remaining(&sale, now).unwrap();
        assert_eq!(remaining.days, 1);
        assert_eq!(remaining.hours, 2);
        assert_eq!(remaining.minutes, 3);
        assert_eq!(remaining.seconds, 4);
        assert_eq!(remaining.total_seconds, 93_784);
    }

    #[test]
    fn evaluator_rereads_clock_each_call() {
        let now = Utc::now();
        let clock = FixedClock::at(now);
        let evaluator = FlashSaleEvaluator::new(Arc::new(clock.clone()));
        let sale = sale_around(now, 1, 1);

        assert_eq!(evaluator.classify(&sale), SaleStatus::Running);
        clock.advance(Duration::seconds(2));
        assert_eq!(evaluator.classify(&sale), SaleStatus::Expired);
    }

    #[test]
    fn percent_discount_floors() {
        let now = Utc::now();
        let sale = FlashSale::new("p", SaleDiscount::Percent(15), now, now, []).unwrap();
        // 15% of 33_333 is 4_999.95, floored to 4_999 off.
        assert_eq!(sale.discounted_price(Money::new(33_333)), Money::new(28_334));
    }

    #[test]
    fn fixed_discount_never_goes_negative() {
        let now = Utc::now();
        let sale =
            FlashSale::new("f", SaleDiscount::Fixed(Money::new(50_000)), now, now, []).unwrap();
        assert_eq!(sale.discounted_price(Money::new(30_000)), Money::zero());
    }

    #[test]
    fn rejects_inverted_window_and_large_percent() {
        let now = Utc::now();
        assert!(matches!(
            FlashSale::new("w", SaleDiscount::Percent(10), now, now - Duration::seconds(1), []),
            Err(FlashSaleError::InvalidWindow { .. })
        ));
        assert!(matches!(
            FlashSale::new("d", SaleDiscount::Percent(101), now, now, []),
            Err(FlashSaleError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn lowest_price_wins_among_overlapping_sales() {
        let now = Utc::now();
        let product = ProductId::new("pho-bo");
        let ten = FlashSale::new(
            "ten",
            SaleDiscount::Percent(10),
            now - Duration::hours(2),
            now + Duration::hours(1),
            [product.clone()],
        )
        .unwrap();
        let fixed = FlashSale::new(
            "fixed",
            SaleDiscount::Fixed(Money::new(8_000)),
            now - Duration::hours(1),
            now + Duration::hours(1),
            [product.clone()],
        )
        .unwrap();

        let sales = [ten, fixed];
        let (winner, price) = best_running_sale(&sales, &product, Money::new(50_000), now).unwrap();
        assert_eq!(winner.id.as_str(), "fixed");
        assert_eq!(price, Money::new(42_000));
    }

    #[test]
    fn ties_go_to_earliest_start() {
        let now = Utc::now();
        let product = ProductId::new("com-tam");
        let late = FlashSale::new(
            "a-late",
            SaleDiscount::Percent(10),
            now - Duration::minutes(5),
            now + Duration::hours(1),
            [product.clone()],
        )
        .unwrap();
        let early = FlashSale::new(
            "z-early",
            SaleDiscount::Percent(10),
            now - Duration::hours(3),
            now + Duration::hours(1),
            [product.clone()],
        )
        .unwrap();

        let sales = [late, early];
        let (winner, _) = best_running_sale(&sales, &product, Money::new(40_000), now).unwrap();
        assert_eq!(winner.id.as_str(), "z-early");
    }

    #[test]
    fn catalog_refuses_duplicate_ids() {
        let now = Utc::now();
        let sale = sale_around(now, 1, 1);
        let result = FlashSaleCatalog::from_sales([sale.clone(), sale]);
        assert!(matches!(result, Err(FlashSaleError::DuplicateId(_))));
    }
}
