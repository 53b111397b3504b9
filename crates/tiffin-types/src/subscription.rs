//! Subscription types and the status state machine
//!
//! ```text
//! trial ──► active ◄──► paused
//!   │         │  │         │
//!   │         │  └► expired│
//!   └─────────┴──► cancelled ◄┘
//! ```
//!
//! Every transition is one-way except `active ⇄ paused`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AddressId, ParseEnumError, PlanId, Slot, SubscriptionId, TrialTypeId, UserId};

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid trial of a vendor's food
    Trial,
    /// Receiving deliveries
    Active,
    /// Deliveries suspended by the customer
    Paused,
    /// Terminated by the customer, an admin or the pause guard
    Cancelled,
    /// Renewal payment failed
    Expired,
}

impl SubscriptionStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Trial,
        Self::Active,
        Self::Paused,
        Self::Cancelled,
        Self::Expired,
    ];

    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Statuses reachable from this one
    pub const fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Trial => &[Self::Active, Self::Cancelled],
            Self::Active => &[Self::Paused, Self::Cancelled, Self::Expired],
            Self::Paused => &[Self::Active, Self::Cancelled],
            Self::Cancelled | Self::Expired => &[],
        }
    }

    /// Whether `self → to` is an edge of the state machine
    pub fn can_transition(&self, to: Self) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(ParseEnumError::new("subscription status", other)),
        }
    }
}

/// A meal slot the customer receives, with their preference for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPreference {
    /// Slot being delivered
    pub slot: Slot,
    /// Free-text preference (e.g. "less spicy, no onion")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Customer subscription to a vendor's plan (or trial)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// Customer who owns the subscription
    pub consumer_id: UserId,
    /// Vendor cooking the meals
    pub vendor_id: UserId,
    /// Plan for paid cycles; `None` while on a trial
    pub plan_id: Option<PlanId>,
    /// Trial type the subscription started from, if any
    pub trial_type_id: Option<TrialTypeId>,
    /// Delivery address
    pub address_id: AddressId,
    /// Current status
    pub status: SubscriptionStatus,
    /// First service day
    pub start_date: NaiveDate,
    /// First day of the current cycle
    pub cycle_start: NaiveDate,
    /// First day after the current cycle
    pub renewal_date: NaiveDate,
    /// Last service day once cancelled or expired
    pub expiry_date: Option<NaiveDate>,
    /// Price of the current cycle in minor currency units
    pub price: i64,
    /// Slots delivered, one entry per slot
    pub meal_preferences: Vec<MealPreference>,
    /// First paused service day
    pub paused_from: Option<NaiveDate>,
    /// Last paused service day, if the customer gave one
    pub paused_until: Option<NaiveDate>,
    /// When the subscription was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why it was cancelled
    pub cancellation_reason: Option<String>,
    /// Gateway payment that funded the current cycle
    pub payment_id: Option<String>,
    /// When the subscription was created
    pub created_at: DateTime<Utc>,
    /// Last modification
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Slots this subscription receives
    pub fn slots(&self) -> Vec<Slot> {
        self.meal_preferences.iter().map(|p| p.slot).collect()
    }
}
