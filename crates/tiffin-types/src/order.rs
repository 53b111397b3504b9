//! Orders: one scheduled meal each

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, ParseEnumError, Slot, SubscriptionId};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for its service date
    Scheduled,
    /// Handed to the customer
    Delivered,
    /// Skipped by the customer
    SkippedByCustomer,
    /// Skipped by the vendor
    SkippedByVendor,
    /// Suppressed while the subscription was paused
    SkippedByPause,
    /// Cancelled with its subscription
    Cancelled,
    /// Could not be fulfilled for operational reasons
    FailedOps,
    /// Customer unavailable at delivery
    NoShow,
}

impl OrderStatus {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Delivered => "delivered",
            Self::SkippedByCustomer => "skipped_by_customer",
            Self::SkippedByVendor => "skipped_by_vendor",
            Self::SkippedByPause => "skipped_by_pause",
            Self::Cancelled => "cancelled",
            Self::FailedOps => "failed_ops",
            Self::NoShow => "no_show",
        }
    }

    /// Whether the meal is still owed to the customer
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Scheduled | Self::SkippedByPause)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "delivered" => Ok(Self::Delivered),
            "skipped_by_customer" => Ok(Self::SkippedByCustomer),
            "skipped_by_vendor" => Ok(Self::SkippedByVendor),
            "skipped_by_pause" => Ok(Self::SkippedByPause),
            "cancelled" => Ok(Self::Cancelled),
            "failed_ops" => Ok(Self::FailedOps),
            "no_show" => Ok(Self::NoShow),
            other => Err(ParseEnumError::new("order status", other)),
        }
    }
}

/// Final outcome a vendor or rider records for a scheduled order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOutcome {
    /// Delivered to the customer
    Delivered,
    /// Vendor could not cook this meal
    SkippedByVendor,
    /// Operational failure
    FailedOps,
    /// Customer unavailable
    NoShow,
}

impl From<OrderOutcome> for OrderStatus {
    fn from(outcome: OrderOutcome) -> Self {
        match outcome {
            OrderOutcome::Delivered => Self::Delivered,
            OrderOutcome::SkippedByVendor => Self::SkippedByVendor,
            OrderOutcome::FailedOps => Self::FailedOps,
            OrderOutcome::NoShow => Self::NoShow,
        }
    }
}

/// One scheduled meal of a subscription or trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Owning subscription
    pub subscription_id: SubscriptionId,
    /// Day of delivery
    pub service_date: NaiveDate,
    /// First day of the billing cycle that paid for this meal
    pub cycle_start: NaiveDate,
    /// Meal slot
    pub slot: Slot,
    /// Current status
    pub status: OrderStatus,
    /// Prepaid value of this meal in minor currency units
    pub price: i64,
    /// When the order was created
    pub created_at: DateTime<Utc>,
}
