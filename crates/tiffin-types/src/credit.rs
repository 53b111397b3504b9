//! Credit ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CreditId, ParseEnumError, SubscriptionId, UserId};

/// Credit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    /// Can be redeemed
    Available,
    /// Passed its expiry before use
    Expired,
    /// Redeemed against a charge
    Used,
}

impl CreditStatus {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Expired => "expired",
            Self::Used => "used",
        }
    }
}

impl std::str::FromStr for CreditStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "expired" => Ok(Self::Expired),
            "used" => Ok(Self::Used),
            other => Err(ParseEnumError::new("credit status", other)),
        }
    }
}

/// What produced a credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// Customer skipped a meal on a plan that credits skips
    Skip,
    /// Meals suppressed by a pause that were not resumed
    Pause,
    /// Unused balance at cancellation
    Cancellation,
    /// Vendor skipped a meal
    VendorSkip,
}

impl CreditSource {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Pause => "pause",
            Self::Cancellation => "cancellation",
            Self::VendorSkip => "vendor_skip",
        }
    }
}

impl std::str::FromStr for CreditSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "pause" => Ok(Self::Pause),
            "cancellation" => Ok(Self::Cancellation),
            "vendor_skip" => Ok(Self::VendorSkip),
            other => Err(ParseEnumError::new("credit source", other)),
        }
    }
}

/// Refundable balance usable against future charges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    /// Credit ID
    pub id: CreditId,
    /// Customer the credit belongs to
    pub consumer_id: UserId,
    /// Subscription that produced it
    pub subscription_id: Option<SubscriptionId>,
    /// Amount in minor currency units
    pub amount: i64,
    /// Origin of the credit
    pub source: CreditSource,
    /// Stored status
    pub status: CreditStatus,
    /// Last instant the credit can be redeemed
    pub expires_at: DateTime<Utc>,
    /// When the credit was minted
    pub created_at: DateTime<Utc>,
}

impl Credit {
    /// Status as of `now`: an available credit past its expiry reads as expired
    /// even before the expiry sweep has run.
    pub fn status_at(&self, now: DateTime<Utc>) -> CreditStatus {
        match self.status {
            CreditStatus::Available if self.expires_at <= now => CreditStatus::Expired,
            status => status,
        }
    }

    /// Whether the credit can be redeemed at `now`
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == CreditStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_available_credit_reads_expired_after_expiry() {
        let now = Utc::now();
        let credit = Credit {
            id: CreditId::new(),
            consumer_id: UserId::new(),
            subscription_id: None,
            amount: 12_000,
            source: CreditSource::Skip,
            status: CreditStatus::Available,
            expires_at: now + Duration::days(1),
            created_at: now,
        };

        assert!(credit.is_redeemable(now));
        assert_eq!(credit.status_at(now + Duration::days(2)), CreditStatus::Expired);

        let used = Credit {
            status: CreditStatus::Used,
            ..credit
        };
        assert_eq!(used.status_at(now + Duration::days(2)), CreditStatus::Used);
    }
}
