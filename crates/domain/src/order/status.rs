//! Order status tables.
//!
//! Fulfillment and payment are tracked on separate axes. The fulfillment
//! table is the only place next states are decided:
//!
//! ```text
//! Pending ──► Confirmed ──► Shipping ──► Completed
//!    │            │            │
//!    └────────────┴────────────┴──► Cancelled
//! ```
//!
//! Payment only moves `Unpaid ──► Paid`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operational stage of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FulfillmentStatus {
    /// Placed, waiting for the shop to accept it.
    #[default]
    Pending,

    /// Accepted by the shop and being prepared.
    Confirmed,

    /// Out for delivery.
    Shipping,

    /// Delivered (terminal).
    Completed,

    /// Cancelled (terminal).
    Cancelled,
}

impl FulfillmentStatus {
    /// Every fulfillment status, in lifecycle order.
    pub const ALL: [FulfillmentStatus; 5] = [
        FulfillmentStatus::Pending,
        FulfillmentStatus::Confirmed,
        FulfillmentStatus::Shipping,
        FulfillmentStatus::Completed,
        FulfillmentStatus::Cancelled,
    ];

    /// The states this one may move to.
    pub fn allowed_successors(&self) -> &'static [FulfillmentStatus] {
        use FulfillmentStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Shipping, Cancelled],
            Shipping => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: FulfillmentStatus) -> bool {
        self.allowed_successors().contains(&next)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_successors().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "Pending",
            FulfillmentStatus::Confirmed => "Confirmed",
            FulfillmentStatus::Shipping => "Shipping",
            FulfillmentStatus::Completed => "Completed",
            FulfillmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment collection state, independent of fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A status name that matches no known state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for FulfillmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FulfillmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownStatus(wanted.to_string()))
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Next fulfillment states an admin may pick from `status`.
pub fn next_fulfillment_states(status: FulfillmentStatus) -> &'static [FulfillmentStatus] {
    status.allowed_successors()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use FulfillmentStatus::*;
        let legal = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Shipping),
            (Confirmed, Cancelled),
            (Shipping, Completed),
            (Shipping, Cancelled),
        ];

        for from in FulfillmentStatus::ALL {
            for to in FulfillmentStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(FulfillmentStatus::Completed.is_terminal());
        assert!(FulfillmentStatus::Cancelled.is_terminal());
        assert!(!FulfillmentStatus::Pending.is_terminal());
        assert!(next_fulfillment_states(FulfillmentStatus::Completed).is_empty());
        assert!(next_fulfillment_states(FulfillmentStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            "shipping".parse::<FulfillmentStatus>(),
            Ok(FulfillmentStatus::Shipping)
        );
        assert_eq!(" Paid ".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert!("lost".parse::<FulfillmentStatus>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(FulfillmentStatus::default(), FulfillmentStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Unpaid);
    }
}
