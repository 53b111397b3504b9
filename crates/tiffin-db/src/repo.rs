//! Repository traits
//!
//! Define async repository interfaces for database operations.
//!
//! Status changes are compare-and-swap: each `mark_*`/`transition*` method
//! only touches rows still in the expected source status and reports whether
//! it did. Callers treat `false` as a lost race.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use tiffin_types::{
    CreditSource, MealPreference, OrderStatus, PlatformSettings, Plan, Role, Slot,
    SubscriptionStatus, TrialType,
};

use crate::error::DbResult;
use crate::models::*;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find all subscriptions of a customer, newest first
    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<SubscriptionRow>>;

    /// Find paused subscriptions whose pause began before `date` and is
    /// still running on `today`
    async fn find_paused_before(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> DbResult<Vec<SubscriptionRow>>;

    /// Find paused subscriptions whose last paused day is before `today`
    async fn find_pauses_ended_before(&self, today: NaiveDate) -> DbResult<Vec<SubscriptionRow>>;

    /// Create a new subscription
    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow>;

    /// `active → paused`
    async fn mark_paused(
        &self,
        id: Uuid,
        paused_from: NaiveDate,
        paused_until: Option<NaiveDate>,
    ) -> DbResult<bool>;

    /// `paused → active`, clearing the pause markers
    async fn mark_resumed(&self, id: Uuid) -> DbResult<bool>;

    /// `from → cancelled`
    async fn mark_cancelled(&self, cancel: CancelSubscription) -> DbResult<bool>;

    /// `active → expired`
    async fn mark_expired(&self, id: Uuid, expiry_date: NaiveDate) -> DbResult<bool>;

    /// Roll an active subscription into its next cycle
    async fn advance_cycle(&self, advance: AdvanceCycle) -> DbResult<bool>;

    /// `trial → active` on a paid plan
    async fn convert_trial(&self, convert: ConvertTrial) -> DbResult<bool>;
}

/// Create subscription input
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub vendor_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub trial_type_id: Option<Uuid>,
    pub address_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub renewal_date: NaiveDate,
    pub price: i64,
    pub meal_preferences: Vec<MealPreference>,
    pub payment_id: Option<String>,
}

/// Cancel subscription input
#[derive(Debug, Clone)]
pub struct CancelSubscription {
    pub id: Uuid,
    pub from: SubscriptionStatus,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
    pub expiry_date: NaiveDate,
}

/// Cycle advance input; guarded on the cycle being renewed
#[derive(Debug, Clone)]
pub struct AdvanceCycle {
    pub id: Uuid,
    pub expected_cycle_start: NaiveDate,
    pub cycle_start: NaiveDate,
    pub renewal_date: NaiveDate,
    pub price: i64,
    pub payment_id: Option<String>,
}

/// Trial conversion input
#[derive(Debug, Clone)]
pub struct ConvertTrial {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub cycle_start: NaiveDate,
    pub renewal_date: NaiveDate,
    pub price: i64,
    pub meal_preferences: Vec<MealPreference>,
    pub payment_id: String,
}

/// Order repository trait
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<OrderRow>>;

    /// Find all orders of a subscription ordered by date, then slot
    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>>;

    /// Find the order for one slot on one day
    async fn find_for_slot(
        &self,
        subscription_id: Uuid,
        service_date: NaiveDate,
        slot: Slot,
    ) -> DbResult<Option<OrderRow>>;

    /// Insert orders, ignoring ones that already exist
    async fn create_many(&self, orders: &[CreateOrder]) -> DbResult<u64>;

    /// Move one order between statuses
    async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> DbResult<bool>;

    /// Move many orders between statuses, returning how many moved
    async fn transition_many(
        &self,
        ids: &[Uuid],
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<u64>;
}

/// Create order input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrder {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub service_date: NaiveDate,
    pub cycle_start: NaiveDate,
    pub slot: Slot,
    pub price: i64,
}

/// Credit repository trait
#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Find all credits of a customer, newest first
    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<CreditRow>>;

    /// Find available, unexpired credits, soonest expiry first
    async fn find_redeemable(
        &self,
        consumer_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<CreditRow>>;

    /// Create a new credit
    async fn create(&self, credit: CreateCredit) -> DbResult<CreditRow>;

    /// `available → used`
    async fn mark_used(&self, id: Uuid) -> DbResult<bool>;

    /// `used → available`, undoing a redemption that did not go through
    async fn mark_available(&self, id: Uuid) -> DbResult<bool>;

    /// Flip every available credit past its expiry to expired
    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64>;
}

/// Create credit input
#[derive(Debug, Clone)]
pub struct CreateCredit {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount: i64,
    pub source: CreditSource,
    pub expires_at: DateTime<Utc>,
}

/// Plan repository trait
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Find a plan by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PlanRow>>;

    /// Insert a plan
    async fn create(&self, plan: &Plan) -> DbResult<PlanRow>;

    /// Overwrite a plan's editable fields
    async fn update(&self, plan: &Plan) -> DbResult<bool>;

    /// Toggle whether a plan accepts subscribers
    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<bool>;
}

/// Trial type repository trait
#[async_trait]
pub trait TrialTypeRepository: Send + Sync {
    /// Find a trial type by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TrialTypeRow>>;

    /// Insert a trial type
    async fn create(&self, trial: &TrialType) -> DbResult<TrialTypeRow>;

    /// Overwrite a trial type's editable fields
    async fn update(&self, trial: &TrialType) -> DbResult<bool>;
}

/// Platform settings repository trait
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load the settings row, if one was ever written
    async fn get(&self) -> DbResult<Option<PlatformSettingsRow>>;

    /// Write the settings row
    async fn save(&self, settings: &PlatformSettings) -> DbResult<()>;
}

/// Skip usage repository trait
#[async_trait]
pub trait SkipUsageRepository: Send + Sync {
    /// Skips used for a slot in a cycle
    async fn used(&self, subscription_id: Uuid, cycle_start: NaiveDate, slot: Slot)
        -> DbResult<i32>;

    /// Count one more skip unless `limit` is already reached.
    ///
    /// Returns the new count, or `None` when the limit blocked the increment.
    async fn try_increment(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
        limit: i32,
    ) -> DbResult<Option<i32>>;

    /// Give back one skip after a failed order update
    async fn release(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
    ) -> DbResult<()>;
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a live session by token hash
    async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<SessionRow>>;

    /// Create a new session
    async fn create(&self, session: CreateSession) -> DbResult<SessionRow>;

    /// Revoke a session
    async fn revoke(&self, id: Uuid) -> DbResult<()>;
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
