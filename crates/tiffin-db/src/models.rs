//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Enum columns are stored as text and decoded into `tiffin-types` domain
//! types through the `TryFrom` impls at the bottom of this file.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use tiffin_types::{
    Credit, CreditId, MealPreference, Order, OrderId, PlatformSettings, Plan, PlanId, PricingMode,
    Session, SessionId, SlotConfig, Subscription, SubscriptionId, TrialType, TrialTypeId,
};

use crate::error::DbError;

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub vendor_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub trial_type_id: Option<Uuid>,
    pub address_id: Uuid,
    pub status: String,
    pub start_date: NaiveDate,
    pub cycle_start: NaiveDate,
    pub renewal_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub price: i64,
    pub meal_preferences: Json<Vec<MealPreference>>,
    pub paused_from: Option<NaiveDate>,
    pub paused_until: Option<NaiveDate>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order row from the database
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub service_date: NaiveDate,
    pub cycle_start: NaiveDate,
    pub slot: String,
    pub status: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// Credit row from the database
#[derive(Debug, Clone, FromRow)]
pub struct CreditRow {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: i64,
    pub source: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Plan row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub period: String,
    pub slots: Json<Vec<SlotConfig>>,
    pub pricing: Json<PricingMode>,
    pub grants_skip_credit: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Trial type row from the database
#[derive(Debug, Clone, FromRow)]
pub struct TrialTypeRow {
    pub id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub duration_days: i32,
    pub price: i64,
    pub slots: Json<Vec<SlotConfig>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Platform settings row (single row table)
#[derive(Debug, Clone, FromRow)]
pub struct PlatformSettingsRow {
    pub pause_notice_hours: i32,
    pub resume_notice_hours: i32,
    pub cancel_notice_hours: i32,
    pub max_pause_days: i32,
    pub credit_expiry_days: i32,
    pub refund_policy: String,
    pub utc_offset_minutes: i32,
}

/// Session row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

fn non_negative(column: &'static str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::decode(column, e))
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DbError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SubscriptionId(row.id),
            consumer_id: row.consumer_id.into(),
            vendor_id: row.vendor_id.into(),
            plan_id: row.plan_id.map(PlanId),
            trial_type_id: row.trial_type_id.map(TrialTypeId),
            address_id: row.address_id.into(),
            status: row
                .status
                .parse()
                .map_err(|e| DbError::decode("subscriptions.status", e))?,
            start_date: row.start_date,
            cycle_start: row.cycle_start,
            renewal_date: row.renewal_date,
            expiry_date: row.expiry_date,
            price: row.price,
            meal_preferences: row.meal_preferences.0,
            paused_from: row.paused_from,
            paused_until: row.paused_until,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            payment_id: row.payment_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId(row.id),
            subscription_id: SubscriptionId(row.subscription_id),
            service_date: row.service_date,
            cycle_start: row.cycle_start,
            slot: row
                .slot
                .parse()
                .map_err(|e| DbError::decode("orders.slot", e))?,
            status: row
                .status
                .parse()
                .map_err(|e| DbError::decode("orders.status", e))?,
            price: row.price,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<CreditRow> for Credit {
    type Error = DbError;

    fn try_from(row: CreditRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CreditId(row.id),
            consumer_id: row.consumer_id.into(),
            subscription_id: row.subscription_id.map(SubscriptionId),
            amount: row.amount,
            source: row
                .source
                .parse()
                .map_err(|e| DbError::decode("credits.source", e))?,
            status: row
                .status
                .parse()
                .map_err(|e| DbError::decode("credits.status", e))?,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PlanRow> for Plan {
    type Error = DbError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PlanId(row.id),
            vendor_id: row.vendor_id.into(),
            name: row.name,
            period: row
                .period
                .parse()
                .map_err(|e| DbError::decode("plans.period", e))?,
            slots: row.slots.0,
            pricing: row.pricing.0,
            grants_skip_credit: row.grants_skip_credit,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TrialTypeRow> for TrialType {
    type Error = DbError;

    fn try_from(row: TrialTypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TrialTypeId(row.id),
            vendor_id: row.vendor_id.map(Into::into),
            name: row.name,
            duration_days: non_negative("trial_types.duration_days", row.duration_days)?,
            price: row.price,
            slots: row.slots.0,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PlatformSettingsRow> for PlatformSettings {
    type Error = DbError;

    fn try_from(row: PlatformSettingsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            pause_notice_hours: non_negative("pause_notice_hours", row.pause_notice_hours)?,
            resume_notice_hours: non_negative("resume_notice_hours", row.resume_notice_hours)?,
            cancel_notice_hours: non_negative("cancel_notice_hours", row.cancel_notice_hours)?,
            max_pause_days: non_negative("max_pause_days", row.max_pause_days)?,
            credit_expiry_days: non_negative("credit_expiry_days", row.credit_expiry_days)?,
            refund_policy: row
                .refund_policy
                .parse()
                .map_err(|e| DbError::decode("refund_policy", e))?,
            utc_offset_minutes: row.utc_offset_minutes,
        })
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SessionId(row.id),
            user_id: row.user_id.into(),
            role: row
                .role
                .parse()
                .map_err(|e| DbError::decode("sessions.role", e))?,
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        })
    }
}
