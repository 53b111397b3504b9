//! Mock repositories for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use sqlx::types::Json;
use uuid::Uuid;

use tiffin_db::{
    AdvanceCycle, CancelSubscription, ConvertTrial, CreateCredit, CreateOrder,
    CreateSubscription, CreditRepository, CreditRow, DbResult, OrderRepository, OrderRow,
    PlanRepository, PlanRow, PlatformSettingsRow, SettingsRepository, SkipUsageRepository,
    SubscriptionRepository, SubscriptionRow, TrialTypeRepository, TrialTypeRow,
};
use tiffin_lifecycle::{
    GatewayOrder, GatewayRefund, LifecycleError, OrderRequest, PaymentGateway,
};
use tiffin_types::{OrderStatus, PlatformSettings, Plan, Slot, SubscriptionStatus, TrialType};

/// In-memory subscription repository for testing
#[derive(Default, Clone)]
pub struct MockSubscriptionRepository {
    subs: Arc<DashMap<Uuid, SubscriptionRow>>,
    stale_cycles: Arc<AtomicBool>,
}

impl MockSubscriptionRepository {
    /// Force a status, bypassing the state machine
    #[allow(dead_code)]
    pub fn set_status(&self, id: Uuid, status: SubscriptionStatus) {
        if let Some(mut sub) = self.subs.get_mut(&id) {
            sub.status = status.as_str().to_string();
        }
    }

    /// Backdate the start of a pause
    #[allow(dead_code)]
    pub fn set_paused_from(&self, id: Uuid, from: NaiveDate) {
        if let Some(mut sub) = self.subs.get_mut(&id) {
            sub.paused_from = Some(from);
        }
    }

    /// Make cycle advances lose their compare-and-swap, as if another
    /// renewal had won
    #[allow(dead_code)]
    pub fn reject_cycle_advances(&self) {
        self.stale_cycles.store(true, Ordering::SeqCst);
    }

    /// Apply `update` if the row is in `from`
    fn swap(&self, id: Uuid, from: &str, update: impl FnOnce(&mut SubscriptionRow)) -> bool {
        match self.subs.get_mut(&id) {
            Some(mut sub) if sub.status == from => {
                update(&mut sub);
                sub.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.subs.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        Ok(self
            .subs
            .iter()
            .filter(|r| r.consumer_id == consumer_id)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn find_paused_before(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> DbResult<Vec<SubscriptionRow>> {
        Ok(self
            .subs
            .iter()
            .filter(|r| {
                r.status == "paused"
                    && r.paused_from.is_some_and(|f| f < date)
                    && r.paused_until.map_or(true, |u| u >= today)
            })
            .map(|r| r.value().clone())
            .collect())
    }

    async fn find_pauses_ended_before(&self, today: NaiveDate) -> DbResult<Vec<SubscriptionRow>> {
        Ok(self
            .subs
            .iter()
            .filter(|r| r.status == "paused" && r.paused_until.is_some_and(|u| u < today))
            .map(|r| r.value().clone())
            .collect())
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let now = Utc::now();
        let row = SubscriptionRow {
            id: sub.id,
            consumer_id: sub.consumer_id,
            vendor_id: sub.vendor_id,
            plan_id: sub.plan_id,
            trial_type_id: sub.trial_type_id,
            address_id: sub.address_id,
            status: sub.status.as_str().to_string(),
            start_date: sub.start_date,
            cycle_start: sub.start_date,
            renewal_date: sub.renewal_date,
            expiry_date: None,
            price: sub.price,
            meal_preferences: Json(sub.meal_preferences),
            paused_from: None,
            paused_until: None,
            cancelled_at: None,
            cancellation_reason: None,
            payment_id: sub.payment_id,
            created_at: now,
            updated_at: now,
        };
        self.subs.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_paused(
        &self,
        id: Uuid,
        paused_from: NaiveDate,
        paused_until: Option<NaiveDate>,
    ) -> DbResult<bool> {
        Ok(self.swap(id, "active", |sub| {
            sub.status = "paused".to_string();
            sub.paused_from = Some(paused_from);
            sub.paused_until = paused_until;
        }))
    }

    async fn mark_resumed(&self, id: Uuid) -> DbResult<bool> {
        Ok(self.swap(id, "paused", |sub| {
            sub.status = "active".to_string();
            sub.paused_from = None;
            sub.paused_until = None;
        }))
    }

    async fn mark_cancelled(&self, cancel: CancelSubscription) -> DbResult<bool> {
        Ok(self.swap(cancel.id, cancel.from.as_str(), |sub| {
            sub.status = "cancelled".to_string();
            sub.cancelled_at = Some(cancel.cancelled_at);
            sub.cancellation_reason = Some(cancel.reason);
            sub.expiry_date = Some(cancel.expiry_date);
            sub.paused_from = None;
            sub.paused_until = None;
        }))
    }

    async fn mark_expired(&self, id: Uuid, expiry_date: NaiveDate) -> DbResult<bool> {
        Ok(self.swap(id, "active", |sub| {
            sub.status = "expired".to_string();
            sub.expiry_date = Some(expiry_date);
        }))
    }

    async fn advance_cycle(&self, advance: AdvanceCycle) -> DbResult<bool> {
        if self.stale_cycles.load(Ordering::SeqCst) {
            return Ok(false);
        }
        match self.subs.get_mut(&advance.id) {
            Some(mut sub)
                if sub.status == "active" && sub.cycle_start == advance.expected_cycle_start =>
            {
                sub.cycle_start = advance.cycle_start;
                sub.renewal_date = advance.renewal_date;
                sub.price = advance.price;
                sub.payment_id = advance.payment_id;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn convert_trial(&self, convert: ConvertTrial) -> DbResult<bool> {
        Ok(self.swap(convert.id, "trial", |sub| {
            sub.status = "active".to_string();
            sub.plan_id = Some(convert.plan_id);
            sub.cycle_start = convert.cycle_start;
            sub.renewal_date = convert.renewal_date;
            sub.price = convert.price;
            sub.meal_preferences = Json(convert.meal_preferences);
            sub.payment_id = Some(convert.payment_id);
        }))
    }
}

/// In-memory order repository for testing
#[derive(Default, Clone)]
pub struct MockOrderRepository {
    orders: Arc<DashMap<Uuid, OrderRow>>,
}

impl MockOrderRepository {
    /// Count a subscription's orders in `status`
    #[allow(dead_code)]
    pub fn count(&self, subscription_id: Uuid, status: OrderStatus) -> usize {
        self.orders
            .iter()
            .filter(|r| r.subscription_id == subscription_id && r.status == status.as_str())
            .count()
    }
}

fn slot_rank(slot: &str) -> Slot {
    slot.parse().unwrap_or(Slot::Dinner)
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<OrderRow>> {
        Ok(self.orders.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>> {
        let mut orders: Vec<OrderRow> = self
            .orders
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .map(|r| r.value().clone())
            .collect();
        orders.sort_by_key(|o| (o.service_date, slot_rank(&o.slot)));
        Ok(orders)
    }

    async fn find_for_slot(
        &self,
        subscription_id: Uuid,
        service_date: NaiveDate,
        slot: Slot,
    ) -> DbResult<Option<OrderRow>> {
        Ok(self
            .orders
            .iter()
            .find(|r| {
                r.subscription_id == subscription_id
                    && r.service_date == service_date
                    && r.slot == slot.as_str()
            })
            .map(|r| r.value().clone()))
    }

    async fn create_many(&self, orders: &[CreateOrder]) -> DbResult<u64> {
        let mut created = 0;
        for order in orders {
            let exists = self
                .find_for_slot(order.subscription_id, order.service_date, order.slot)
                .await?
                .is_some();
            if exists {
                continue;
            }
            self.orders.insert(
                order.id,
                OrderRow {
                    id: order.id,
                    subscription_id: order.subscription_id,
                    service_date: order.service_date,
                    cycle_start: order.cycle_start,
                    slot: order.slot.as_str().to_string(),
                    status: "scheduled".to_string(),
                    price: order.price,
                    created_at: Utc::now(),
                },
            );
            created += 1;
        }
        Ok(created)
    }

    async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> DbResult<bool> {
        match self.orders.get_mut(&id) {
            Some(mut order) if order.status == from.as_str() => {
                order.status = to.as_str().to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_many(
        &self,
        ids: &[Uuid],
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<u64> {
        let mut moved = 0;
        for id in ids {
            if self.transition(*id, from, to).await? {
                moved += 1;
            }
        }
        Ok(moved)
    }
}

/// In-memory credit repository for testing
#[derive(Default, Clone)]
pub struct MockCreditRepository {
    credits: Arc<DashMap<Uuid, CreditRow>>,
}

impl MockCreditRepository {
    /// Every credit row, in no particular order
    #[allow(dead_code)]
    pub fn all(&self) -> Vec<CreditRow> {
        self.credits.iter().map(|r| r.value().clone()).collect()
    }
}

#[async_trait]
impl CreditRepository for MockCreditRepository {
    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<CreditRow>> {
        let mut credits: Vec<CreditRow> = self
            .credits
            .iter()
            .filter(|r| r.consumer_id == consumer_id)
            .map(|r| r.value().clone())
            .collect();
        credits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(credits)
    }

    async fn find_redeemable(
        &self,
        consumer_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<CreditRow>> {
        let mut credits: Vec<CreditRow> = self
            .credits
            .iter()
            .filter(|r| r.consumer_id == consumer_id && r.status == "available" && r.expires_at > now)
            .map(|r| r.value().clone())
            .collect();
        credits.sort_by_key(|c| (c.expires_at, c.created_at));
        Ok(credits)
    }

    async fn create(&self, credit: CreateCredit) -> DbResult<CreditRow> {
        let row = CreditRow {
            id: credit.id,
            consumer_id: credit.consumer_id,
            subscription_id: credit.subscription_id,
            amount: credit.amount,
            source: credit.source.as_str().to_string(),
            status: "available".to_string(),
            expires_at: credit.expires_at,
            created_at: Utc::now(),
        };
        self.credits.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_used(&self, id: Uuid) -> DbResult<bool> {
        match self.credits.get_mut(&id) {
            Some(mut credit) if credit.status == "available" => {
                credit.status = "used".to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_available(&self, id: Uuid) -> DbResult<bool> {
        match self.credits.get_mut(&id) {
            Some(mut credit) if credit.status == "used" => {
                credit.status = "available".to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let mut expired = 0;
        for mut credit in self.credits.iter_mut() {
            if credit.status == "available" && credit.expires_at <= now {
                credit.status = "expired".to_string();
                expired += 1;
            }
        }
        Ok(expired)
    }
}

/// In-memory plan repository for testing
#[derive(Default, Clone)]
pub struct MockPlanRepository {
    plans: Arc<DashMap<Uuid, PlanRow>>,
}

fn plan_row(plan: &Plan) -> PlanRow {
    PlanRow {
        id: plan.id.0,
        vendor_id: plan.vendor_id.0,
        name: plan.name.clone(),
        period: plan.period.as_str().to_string(),
        slots: Json(plan.slots.clone()),
        pricing: Json(plan.pricing),
        grants_skip_credit: plan.grants_skip_credit,
        active: plan.active,
        created_at: plan.created_at,
    }
}

#[async_trait]
impl PlanRepository for MockPlanRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PlanRow>> {
        Ok(self.plans.get(&id).map(|r| r.value().clone()))
    }

    async fn create(&self, plan: &Plan) -> DbResult<PlanRow> {
        let row = plan_row(plan);
        self.plans.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, plan: &Plan) -> DbResult<bool> {
        if !self.plans.contains_key(&plan.id.0) {
            return Ok(false);
        }
        self.plans.insert(plan.id.0, plan_row(plan));
        Ok(true)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<bool> {
        match self.plans.get_mut(&id) {
            Some(mut plan) => {
                plan.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory trial type repository for testing
#[derive(Default, Clone)]
pub struct MockTrialTypeRepository {
    trials: Arc<DashMap<Uuid, TrialTypeRow>>,
}

fn trial_row(trial: &TrialType) -> TrialTypeRow {
    TrialTypeRow {
        id: trial.id.0,
        vendor_id: trial.vendor_id.map(|v| v.0),
        name: trial.name.clone(),
        duration_days: trial.duration_days as i32,
        price: trial.price,
        slots: Json(trial.slots.clone()),
        active: trial.active,
        created_at: trial.created_at,
    }
}

#[async_trait]
impl TrialTypeRepository for MockTrialTypeRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TrialTypeRow>> {
        Ok(self.trials.get(&id).map(|r| r.value().clone()))
    }

    async fn create(&self, trial: &TrialType) -> DbResult<TrialTypeRow> {
        let row = trial_row(trial);
        self.trials.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, trial: &TrialType) -> DbResult<bool> {
        if !self.trials.contains_key(&trial.id.0) {
            return Ok(false);
        }
        self.trials.insert(trial.id.0, trial_row(trial));
        Ok(true)
    }
}

/// In-memory settings repository for testing
#[derive(Default, Clone)]
pub struct MockSettingsRepository {
    settings: Arc<DashMap<u8, PlatformSettingsRow>>,
}

#[async_trait]
impl SettingsRepository for MockSettingsRepository {
    async fn get(&self) -> DbResult<Option<PlatformSettingsRow>> {
        Ok(self.settings.get(&1).map(|r| r.value().clone()))
    }

    async fn save(&self, settings: &PlatformSettings) -> DbResult<()> {
        self.settings.insert(
            1,
            PlatformSettingsRow {
                pause_notice_hours: settings.pause_notice_hours as i32,
                resume_notice_hours: settings.resume_notice_hours as i32,
                cancel_notice_hours: settings.cancel_notice_hours as i32,
                max_pause_days: settings.max_pause_days as i32,
                credit_expiry_days: settings.credit_expiry_days as i32,
                refund_policy: settings.refund_policy.as_str().to_string(),
                utc_offset_minutes: settings.utc_offset_minutes,
            },
        );
        Ok(())
    }
}

/// In-memory skip counter for testing
#[derive(Default, Clone)]
pub struct MockSkipUsageRepository {
    usage: Arc<DashMap<(Uuid, NaiveDate, Slot), i32>>,
}

#[async_trait]
impl SkipUsageRepository for MockSkipUsageRepository {
    async fn used(&self, subscription_id: Uuid, cycle_start: NaiveDate, slot: Slot) -> DbResult<i32> {
        Ok(self
            .usage
            .get(&(subscription_id, cycle_start, slot))
            .map(|r| *r.value())
            .unwrap_or(0))
    }

    async fn try_increment(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
        limit: i32,
    ) -> DbResult<Option<i32>> {
        let mut used = self
            .usage
            .entry((subscription_id, cycle_start, slot))
            .or_insert(0);
        if *used < limit {
            *used += 1;
            Ok(Some(*used))
        } else {
            Ok(None)
        }
    }

    async fn release(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
    ) -> DbResult<()> {
        if let Some(mut used) = self.usage.get_mut(&(subscription_id, cycle_start, slot)) {
            *used = (*used - 1).max(0);
        }
        Ok(())
    }
}

/// Recording payment gateway for testing
#[derive(Default, Clone)]
pub struct MockGateway {
    pub orders: Arc<Mutex<Vec<OrderRequest>>>,
    pub refunds: Arc<Mutex<Vec<(String, i64)>>>,
    fail_refunds: Arc<AtomicBool>,
}

impl MockGateway {
    /// Make every refund fail
    #[allow(dead_code)]
    pub fn fail_refunds(&self) {
        self.fail_refunds.store(true, Ordering::SeqCst);
    }

    /// Refunds requested so far
    #[allow(dead_code)]
    pub fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().unwrap().clone()
    }

    /// Orders created so far
    #[allow(dead_code)]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, LifecycleError> {
        let order = GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: "INR".to_string(),
        };
        self.orders.lock().unwrap().push(request);
        Ok(order)
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: i64,
        _notes: HashMap<String, String>,
    ) -> Result<GatewayRefund, LifecycleError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(LifecycleError::Gateway("gateway unavailable".to_string()));
        }
        self.refunds
            .lock()
            .unwrap()
            .push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("rfnd_{}", Uuid::new_v4().simple()),
            amount,
        })
    }
}
