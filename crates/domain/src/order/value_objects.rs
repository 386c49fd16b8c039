//! Value objects for the order domain.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pricing::DeliveryMethod;

use super::OrderError;

/// Contact and delivery details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl CustomerInfo {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Checks required fields. The address is only required for delivery.
    pub fn validate(&self, delivery: DeliveryMethod) -> Result<(), OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::MissingCustomerField("name"));
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::MissingCustomerField("phone"));
        }
        if delivery == DeliveryMethod::Delivery && self.address.trim().is_empty() {
            return Err(OrderError::MissingCustomerField("address"));
        }
        Ok(())
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    /// Cash on delivery. Stays unpaid until marked paid.
    #[default]
    CashOnDelivery,
    BankTransfer,
}

impl FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" | "cash_on_delivery" | "cashondelivery" => Ok(PaymentMethod::CashOnDelivery),
            "bank_transfer" | "banktransfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// Who asked for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    Customer,
    Admin,
    /// Automated jobs.
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Actor::Customer => "customer",
            Actor::Admin => "admin",
            Actor::System => "system",
        };
        f.write_str(name)
    }
}
