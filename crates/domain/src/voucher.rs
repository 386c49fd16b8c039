//! Voucher validation.
//!
//! A voucher is an issued discount code with a fixed amount off and a minimum
//! subtotal. Validation is a read: it never marks a voucher as used, so the
//! same code can be redeemed by any number of checkouts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::Money;

/// Normalized voucher code: trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Normalizes raw user input. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An issued voucher. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub code: String,
    pub title: String,
    pub min_subtotal: Money,
    pub discount_amount: Money,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Creates a voucher that never expires.
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        min_subtotal: Money,
        discount_amount: Money,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            min_subtotal,
            discount_amount,
            expires_at: None,
        }
    }

    /// Sets an expiry instant.
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// An accepted voucher and the amount it takes off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherDiscount {
    pub code: VoucherCode,
    pub title: String,
    /// Never more than the subtotal it was validated against.
    pub amount: Money,
}

/// Why a voucher code was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherRejection {
    #[error("voucher code is blank")]
    Empty,

    #[error("voucher {code} does not exist")]
    NotFound { code: String },

    #[error("voucher {code} requires a subtotal of at least {required} (got {subtotal})")]
    BelowMinimumSubtotal {
        code: String,
        required: Money,
        subtotal: Money,
    },

    #[error("voucher {code} expired at {expired_at}")]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    #[error("subtotal {0} is negative")]
    InvalidSubtotal(Money),
}

impl VoucherRejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            VoucherRejection::Empty => "VOUCHER_EMPTY",
            VoucherRejection::NotFound { .. } => "VOUCHER_NOT_FOUND",
            VoucherRejection::BelowMinimumSubtotal { .. } => "VOUCHER_BELOW_MINIMUM",
            VoucherRejection::Expired { .. } => "VOUCHER_EXPIRED",
            VoucherRejection::InvalidSubtotal(_) => "INVALID_SUBTOTAL",
        }
    }

    /// Message shown to the shopper.
    pub fn user_message(&self) -> String {
        match self {
            VoucherRejection::Empty => "Vui lòng nhập mã giảm giá".to_string(),
            VoucherRejection::NotFound { .. } => "Mã giảm giá không hợp lệ".to_string(),
            VoucherRejection::BelowMinimumSubtotal { required, .. } => {
                format!("Đơn hàng tối thiểu {required} để dùng mã giảm giá này")
            }
            VoucherRejection::Expired { .. } => "Mã giảm giá đã hết hạn".to_string(),
            VoucherRejection::InvalidSubtotal(_) => "Giá trị đơn hàng không hợp lệ".to_string(),
        }
    }
}

/// Error raised when issuing vouchers into a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherIssueError {
    #[error("voucher code is blank")]
    BlankCode,

    #[error("voucher code {0} is already issued")]
    DuplicateCode(String),

    #[error("voucher {code} has a negative amount")]
    NegativeAmount { code: String },
}

/// The set of issued vouchers, keyed by normalized code.
#[derive(Debug, Clone, Default)]
pub struct VoucherCatalog {
    vouchers: HashMap<VoucherCode, Voucher>,
}

impl VoucherCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, failing on the first invalid or duplicate voucher.
    pub fn from_vouchers(
        vouchers: impl IntoIterator<Item = Voucher>,
    ) -> Result<Self, VoucherIssueError> {
        let mut catalog = Self::new();
        for voucher in vouchers {
            catalog.issue(voucher)?;
        }
        Ok(catalog)
    }

    /// Adds a voucher. Codes are unique case-insensitively.
    pub fn issue(&mut self, voucher: Voucher) -> Result<(), VoucherIssueError> {
        let code = VoucherCode::parse(&voucher.code).ok_or(VoucherIssueError::BlankCode)?;
        if voucher.min_subtotal.is_negative() || voucher.discount_amount.is_negative() {
            return Err(VoucherIssueError::NegativeAmount {
                code: code.to_string(),
            });
        }
        if self.vouchers.contains_key(&code) {
            return Err(VoucherIssueError::DuplicateCode(code.to_string()));
        }
        self.vouchers.insert(code, voucher);
        Ok(())
    }

    /// Looks up a voucher by raw code.
    pub fn get(&self, raw_code: &str) -> Option<&Voucher> {
        VoucherCode::parse(raw_code).and_then(|code| self.vouchers.get(&code))
    }

    /// Returns the number of issued vouchers.
    pub fn len(&self) -> usize {
        self.vouchers.len()
    }

    /// Returns true if no vouchers are issued.
    pub fn is_empty(&self) -> bool {
        self.vouchers.is_empty()
    }

    /// Checks `raw_code` against `subtotal` at instant `now`.
    ///
    /// Checks run in a fixed order (blank, subtotal sign, existence, expiry,
    /// minimum) so a given input always produces the same answer.
    pub fn validate(
        &self,
        raw_code: &str,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<VoucherDiscount, VoucherRejection> {
        let code = VoucherCode::parse(raw_code).ok_or(VoucherRejection::Empty)?;

        if subtotal.is_negative() {
            return Err(VoucherRejection::InvalidSubtotal(subtotal));
        }

        let voucher = self
            .vouchers
            .get(&code)
            .ok_or_else(|| VoucherRejection::NotFound {
                code: code.to_string(),
            })?;

        if let Some(expired_at) = voucher.expires_at
            && now > expired_at
        {
            return Err(VoucherRejection::Expired {
                code: code.to_string(),
                expired_at,
            });
        }

        if subtotal < voucher.min_subtotal {
            return Err(VoucherRejection::BelowMinimumSubtotal {
                code: code.to_string(),
                required: voucher.min_subtotal,
                subtotal,
            });
        }

        Ok(VoucherDiscount {
            code,
            title: voucher.title.clone(),
            amount: voucher.discount_amount.min(subtotal),
        })
    }
}
