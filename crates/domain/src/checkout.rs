//! Checkout facade: flash sales, voucher validation and pricing in one call.

use std::sync::Arc;

use common::Clock;
use serde::Serialize;
use thiserror::Error;

use crate::flash_sale::{FlashSaleCatalog, FlashSaleEvaluator, FlashSaleId, SaleSnapshot};
use crate::pricing::{
    CartLine, DeliveryMethod, PricedOrder, PricingEngine, PricingError, apply_flash_sales,
};
use crate::voucher::{VoucherCatalog, VoucherRejection};

/// Why a checkout could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Voucher(#[from] VoucherRejection),
}

impl CheckoutError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::Pricing(e) => e.code(),
            CheckoutError::Voucher(e) => e.code(),
        }
    }

    /// Input errors are malformed requests; everything else is a business
    /// rejection the shopper can fix.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::Pricing(_)
                | CheckoutError::Voucher(VoucherRejection::Empty)
                | CheckoutError::Voucher(VoucherRejection::InvalidSubtotal(_))
        )
    }

    /// Message shown to the shopper.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Pricing(PricingError::EmptyCart) => "Giỏ hàng đang trống".to_string(),
            CheckoutError::Pricing(_) => "Thông tin giỏ hàng không hợp lệ".to_string(),
            CheckoutError::Voucher(e) => e.user_message(),
        }
    }
}

/// A priced cart together with the lines as they were priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    pub lines: Vec<CartLine>,
    pub priced: PricedOrder,
}

/// Everything the storefront needs to price a cart.
#[derive(Clone)]
pub struct Checkout {
    engine: PricingEngine,
    vouchers: Arc<VoucherCatalog>,
    sales: Arc<FlashSaleCatalog>,
    clock: Arc<dyn Clock>,
}

impl Checkout {
    pub fn new(
        engine: PricingEngine,
        vouchers: Arc<VoucherCatalog>,
        sales: Arc<FlashSaleCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            vouchers,
            sales,
            clock,
        }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn vouchers(&self) -> &VoucherCatalog {
        &self.vouchers
    }

    pub fn flash_sales(&self) -> &FlashSaleCatalog {
        &self.sales
    }

    /// Prices a cart for checkout.
    ///
    /// Running flash sales are applied first, and the voucher minimum is
    /// checked against the sale-adjusted subtotal. `None` means no voucher was
    /// entered; `Some("")` is an explicit blank code and is rejected.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub fn price_checkout(
        &self,
        lines: &[CartLine],
        delivery: DeliveryMethod,
        voucher_code: Option<&str>,
    ) -> Result<CheckoutQuote, CheckoutError> {
        let result = self.quote(lines, delivery, voucher_code);

        match &result {
            Ok(quote) => {
                metrics::counter!("checkout_priced_total").increment(1);
                tracing::debug!(total = %quote.priced.total, "Checkout priced");
            }
            Err(e) => {
                metrics::counter!("checkout_rejected_total", "reason" => e.code()).increment(1);
                tracing::debug!(reason = e.code(), "Checkout rejected");
            }
        }

        result
    }

    fn quote(
        &self,
        lines: &[CartLine],
        delivery: DeliveryMethod,
        voucher_code: Option<&str>,
    ) -> Result<CheckoutQuote, CheckoutError> {
        if lines.is_empty() {
            return Err(PricingError::EmptyCart.into());
        }

        let now = self.clock.now();
        let lines = apply_flash_sales(lines, self.sales.iter(), now);
        let subtotal = self.engine.subtotal(&lines)?;

        let discount = voucher_code
            .map(|code| self.vouchers.validate(code, subtotal, now))
            .transpose()?;

        let priced = self.engine.price(&lines, delivery, discount.as_ref())?;
        Ok(CheckoutQuote { lines, priced })
    }

    /// Status and countdown of one flash sale, read against the live clock.
    pub fn classify_flash_sale(&self, id: &FlashSaleId) -> Option<SaleSnapshot> {
        let sale = self.sales.get(id)?;
        Some(FlashSaleEvaluator::new(Arc::clone(&self.clock)).snapshot(sale))
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("engine", &self.engine)
            .field("vouchers", &self.vouchers.len())
            .field("flash_sales", &self.sales.len())
            .finish_non_exhaustive()
    }
}
