//! Platform-wide lifecycle settings

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InvalidInput, ParseEnumError};

/// Largest notice window an admin may configure (one week)
pub const MAX_NOTICE_HOURS: u32 = 168;

/// How an unused prepaid balance is returned at cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    /// Always refunded through the payment gateway
    RefundOnly,
    /// Always returned as platform credit
    CreditOnly,
    /// The customer picks refund or credit
    CustomerChoice,
}

impl RefundPolicy {
    /// Wire/database representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RefundOnly => "refund_only",
            Self::CreditOnly => "credit_only",
            Self::CustomerChoice => "customer_choice",
        }
    }
}

impl std::fmt::Display for RefundPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RefundPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refund_only" => Ok(Self::RefundOnly),
            "credit_only" => Ok(Self::CreditOnly),
            "customer_choice" => Ok(Self::CustomerChoice),
            other => Err(ParseEnumError::new("refund policy", other)),
        }
    }
}

/// The customer's pick under [`RefundPolicy::CustomerChoice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundChoice {
    /// Money back through the gateway
    Refund,
    /// Platform credit
    Credit,
}

/// Lifecycle policy shared by every subscription on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Lead time before the next delivery required to pause
    pub pause_notice_hours: u32,
    /// Lead time before the first resumed delivery required to resume
    pub resume_notice_hours: u32,
    /// Lead time before the next delivery required to cancel
    pub cancel_notice_hours: u32,
    /// Pauses longer than this make a subscription eligible for forced cancellation
    pub max_pause_days: u32,
    /// Days a minted credit stays redeemable
    pub credit_expiry_days: u32,
    /// Cancellation settlement policy
    pub refund_policy: RefundPolicy,
    /// Offset of the platform's local time from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            pause_notice_hours: 24,
            resume_notice_hours: 24,
            cancel_notice_hours: 24,
            max_pause_days: 30,
            credit_expiry_days: 90,
            refund_policy: RefundPolicy::CustomerChoice,
            utc_offset_minutes: 330,
        }
    }
}

impl PlatformSettings {
    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), InvalidInput> {
        for (name, hours) in [
            ("pause_notice_hours", self.pause_notice_hours),
            ("resume_notice_hours", self.resume_notice_hours),
            ("cancel_notice_hours", self.cancel_notice_hours),
        ] {
            if hours > MAX_NOTICE_HOURS {
                return Err(InvalidInput::new(format!(
                    "{name} cannot exceed {MAX_NOTICE_HOURS}"
                )));
            }
        }
        if self.max_pause_days == 0 {
            return Err(InvalidInput::new("max_pause_days must be at least 1"));
        }
        if self.credit_expiry_days == 0 {
            return Err(InvalidInput::new("credit_expiry_days must be at least 1"));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(InvalidInput::new("utc_offset_minutes must be within a day"));
        }
        Ok(())
    }

    /// UTC instant of a local `time` on `date`
    pub fn delivery_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        (date.and_time(time) - Duration::minutes(i64::from(self.utc_offset_minutes))).and_utc()
    }

    /// Local calendar date at `instant`
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        (instant.naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))).date()
    }

    /// Expiry of a credit minted at `now`
    pub fn credit_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.credit_expiry_days))
    }
}
