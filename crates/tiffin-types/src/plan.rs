//! Meal slots, plans and trial types

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InvalidInput, ParseEnumError, PlanId, TrialTypeId, UserId};

/// Longest skip cutoff a plan may configure
pub const MAX_SKIP_CUTOFF_HOURS: u32 = 72;

/// Meal time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Morning meal
    Breakfast,
    /// Midday meal
    Lunch,
    /// Evening meal
    Dinner,
}

impl Slot {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }

    /// Delivery window start used when a plan does not set one
    pub fn default_window_start(&self) -> NaiveTime {
        let (h, m) = match self {
            Self::Breakfast => (8, 0),
            Self::Lunch => (12, 30),
            Self::Dinner => (19, 30),
        };
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            _ => Err(ParseEnumError::new("slot", s)),
        }
    }
}

/// Billing period of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPeriod {
    /// Seven days
    Weekly,
    /// One calendar month
    Monthly,
}

impl PlanPeriod {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// First day after a cycle starting on `start`
    pub fn cycle_end(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => start + chrono::Duration::days(7),
            Self::Monthly => start
                .checked_add_months(Months::new(1))
                .unwrap_or(start + chrono::Duration::days(30)),
        }
    }
}

impl std::fmt::Display for PlanPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanPeriod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(ParseEnumError::new("plan period", other)),
        }
    }
}

/// How a plan's cycle price is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PricingMode {
    /// Each meal costs its slot's base price less a percentage
    PerMealDiscount {
        /// Discount in percent (0-100)
        percent: u8,
    },
    /// The whole cycle costs a flat amount
    Fixed {
        /// Cycle price in minor currency units
        cycle_price: i64,
    },
}

/// Per-slot configuration of a plan or trial type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Slot this entry configures
    pub slot: Slot,
    /// Undiscounted price of one meal in minor currency units
    pub base_price: i64,
    /// Skips allowed per cycle for this slot
    pub skip_limit: u32,
    /// Skips must be requested at least this many hours before delivery
    pub skip_cutoff_hours: u32,
    /// Local start of the delivery window
    pub delivery_window_start: NaiveTime,
}

impl SlotConfig {
    fn validate(&self) -> Result<(), InvalidInput> {
        if self.base_price < 0 {
            return Err(InvalidInput::new(format!(
                "{} base price cannot be negative",
                self.slot
            )));
        }
        if self.skip_cutoff_hours > MAX_SKIP_CUTOFF_HOURS {
            return Err(InvalidInput::new(format!(
                "{} skip cutoff exceeds {MAX_SKIP_CUTOFF_HOURS} hours",
                self.slot
            )));
        }
        Ok(())
    }
}

fn validate_slots(slots: &[SlotConfig]) -> Result<(), InvalidInput> {
    if slots.is_empty() {
        return Err(InvalidInput::new("at least one slot is required"));
    }
    for (i, config) in slots.iter().enumerate() {
        config.validate()?;
        if slots[..i].iter().any(|c| c.slot == config.slot) {
            return Err(InvalidInput::new(format!("duplicate slot: {}", config.slot)));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), InvalidInput> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::new("name cannot be empty"));
    }
    if trimmed.len() > 120 {
        return Err(InvalidInput::new("name too long (max 120 chars)"));
    }
    Ok(())
}

/// Vendor meal plan template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan ID
    pub id: PlanId,
    /// Vendor selling the plan
    pub vendor_id: UserId,
    /// Display name
    pub name: String,
    /// Billing period
    pub period: PlanPeriod,
    /// Slots on offer
    pub slots: Vec<SlotConfig>,
    /// Price derivation
    pub pricing: PricingMode,
    /// Whether a customer skip is credited back
    pub grants_skip_credit: bool,
    /// Inactive plans accept no new subscribers
    pub active: bool,
    /// When the plan was created
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Configuration for a slot, if offered
    pub fn slot(&self, slot: Slot) -> Option<&SlotConfig> {
        self.slots.iter().find(|c| c.slot == slot)
    }

    /// Price of one `slot` meal under per-meal pricing
    pub fn discounted_meal_price(&self, slot: Slot) -> Option<i64> {
        let config = self.slot(slot)?;
        match self.pricing {
            PricingMode::PerMealDiscount { percent } => {
                Some(config.base_price * i64::from(100 - percent.min(100)) / 100)
            }
            PricingMode::Fixed { .. } => None,
        }
    }

    /// Check the plan is internally consistent
    pub fn validate(&self) -> Result<(), InvalidInput> {
        validate_name(&self.name)?;
        validate_slots(&self.slots)?;
        match self.pricing {
            PricingMode::PerMealDiscount { percent } if percent > 100 => {
                Err(InvalidInput::new("discount cannot exceed 100 percent"))
            }
            PricingMode::Fixed { cycle_price } if cycle_price <= 0 => {
                Err(InvalidInput::new("fixed cycle price must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// Admin-defined trial offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialType {
    /// Trial type ID
    pub id: TrialTypeId,
    /// Vendor offering the trial; `None` for platform-wide trials
    pub vendor_id: Option<UserId>,
    /// Display name
    pub name: String,
    /// Trial length in days
    pub duration_days: u32,
    /// Total trial price in minor currency units
    pub price: i64,
    /// Slots the trial may include
    pub slots: Vec<SlotConfig>,
    /// Inactive trial types accept no new trials
    pub active: bool,
    /// When the trial type was created
    pub created_at: DateTime<Utc>,
}

impl TrialType {
    /// Configuration for a slot, if offered
    pub fn slot(&self, slot: Slot) -> Option<&SlotConfig> {
        self.slots.iter().find(|c| c.slot == slot)
    }

    /// Check the trial type is internally consistent
    pub fn validate(&self) -> Result<(), InvalidInput> {
        validate_name(&self.name)?;
        validate_slots(&self.slots)?;
        if !(1..=14).contains(&self.duration_days) {
            return Err(InvalidInput::new("trial must last between 1 and 14 days"));
        }
        if self.price < 0 {
            return Err(InvalidInput::new("trial price cannot be negative"));
        }
        Ok(())
    }
}
