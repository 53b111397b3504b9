//! Subscription lifecycle service
//!
//! Applies the status transitions of [`SubscriptionStatus`] subject to the
//! platform's notice windows, per-slot skip limits and refund policy. Every
//! status write is a compare-and-swap against the status that was read; a
//! lost race surfaces as [`LifecycleError::Conflict`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use tiffin_db::CancelSubscription;
use tiffin_types::{
    Actor, Credit, CreditSource, Order, OrderStatus, Plan, PlanId, PlatformSettings,
    RefundChoice, Role, Slot, SlotConfig, Subscription, SubscriptionId, SubscriptionStatus,
    TrialType,
};

use crate::error::{LifecycleError, LifecycleResult};
use crate::gateway::PaymentGateway;
use crate::ledger::CreditLedger;
use crate::notice::{auto_cancel_eligible, ensure_lead_time, pause_cutoff, pause_has_ended};
use crate::policy::{self, Settlement, SettlementMethod};
use crate::schedule::delivery_instant;
use crate::stores::Stores;

const DEFAULT_CANCEL_REASON: &str = "customer request";
const MAX_REASON_LEN: usize = 500;

/// A subscription with its orders
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    /// The subscription
    pub subscription: Subscription,
    /// Its orders, by date then slot
    pub orders: Vec<Order>,
}

/// Result of a pause
#[derive(Debug, Clone, Serialize)]
pub struct PauseOutcome {
    /// Paused subscription
    pub subscription: Subscription,
    /// Orders moved to `skipped_by_pause`
    pub paused_orders: u64,
}

/// Result of a resume
#[derive(Debug, Clone, Serialize)]
pub struct ResumeOutcome {
    /// Resumed subscription
    pub subscription: Subscription,
    /// First day deliveries restart
    pub resumed_on: NaiveDate,
    /// Orders moved back to `scheduled`
    pub reactivated_orders: u64,
    /// Credit for paused meals that were not resumed
    pub credit: Option<Credit>,
}

/// Result of a cancellation
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    /// Cancelled subscription
    pub subscription: Subscription,
    /// Unused prepaid balance
    pub balance: i64,
    /// How the balance was returned
    pub settlement: Settlement,
}

/// Result of a skip
#[derive(Debug, Clone, Serialize)]
pub struct SkipOutcome {
    /// Skipped order
    pub order: Order,
    /// Skips used for the slot this cycle
    pub used: u32,
    /// Skips left for the slot this cycle
    pub remaining: u32,
    /// Credit minted for the skipped meal
    pub credit: Option<Credit>,
}

/// Result of an auto-cancel sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Bounded pauses that had run their course and went back to active
    pub resumed: Vec<SubscriptionId>,
    /// Subscriptions force-cancelled
    pub cancelled: Vec<SubscriptionId>,
    /// Eligible subscriptions that could not be cancelled
    pub failed: Vec<SubscriptionId>,
}

/// Cancellation parameters shared by customer and forced cancellation
struct CancelTerms {
    reason: String,
    choice: Option<RefundChoice>,
    default_choice: Option<RefundChoice>,
    enforce_notice: bool,
}

/// Subscription lifecycle service
#[derive(Clone)]
pub struct LifecycleService {
    pub(crate) stores: Stores,
    pub(crate) ledger: CreditLedger,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    pub(crate) key_secret: String,
}

impl LifecycleService {
    /// Create a new lifecycle service
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: impl Into<String>,
    ) -> Self {
        let ledger = CreditLedger::new(stores.credits.clone());
        Self {
            stores,
            ledger,
            gateway,
            key_secret: key_secret.into(),
        }
    }

    /// The credit ledger
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Current platform settings
    pub async fn settings(&self) -> LifecycleResult<PlatformSettings> {
        self.stores.platform_settings().await
    }

    /// Fetch a subscription the actor may see
    pub async fn get(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<SubscriptionView> {
        let subscription = self.load(id).await?;
        authorize_view(actor, &subscription)?;
        let settings = self.settings().await?;
        let subscription = self.end_lapsed_pause(subscription, &settings, now).await?;
        self.view(subscription).await
    }

    /// `active → paused`.
    ///
    /// The pause starts at the next scheduled delivery, which must be at
    /// least `pause_notice_hours` away. Scheduled orders from there (through
    /// `until`, when given) move to `skipped_by_pause`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn pause(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        until: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<PauseOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        authorize_manage(actor, &sub)?;
        if sub.status != SubscriptionStatus::Active {
            return Err(invalid_transition(sub.status, "pause"));
        }

        let timed = self.timed_orders(&sub, &settings).await?;
        let upcoming: Vec<&(Order, DateTime<Utc>)> = timed
            .iter()
            .filter(|(o, at)| o.status == OrderStatus::Scheduled && *at > now)
            .collect();

        let paused_from = match upcoming.first() {
            Some((order, at)) => {
                ensure_lead_time(now, *at, settings.pause_notice_hours)?;
                order.service_date
            }
            None => settings.local_date(now),
        };

        if let Some(until) = until {
            if until < paused_from {
                return Err(LifecycleError::validation(format!(
                    "pause must end on or after {paused_from}"
                )));
            }
            if (until - paused_from).num_days() > i64::from(settings.max_pause_days) {
                return Err(LifecycleError::validation(format!(
                    "pause cannot exceed {} days",
                    settings.max_pause_days
                )));
            }
        }

        let affected: Vec<Uuid> = upcoming
            .iter()
            .filter(|(o, _)| until.map_or(true, |u| o.service_date <= u))
            .map(|(o, _)| o.id.0)
            .collect();

        if !self
            .stores
            .subscriptions
            .mark_paused(id.0, paused_from, until)
            .await?
        {
            return Err(lost_race());
        }

        let paused_orders = self
            .stores
            .orders
            .transition_many(&affected, OrderStatus::Scheduled, OrderStatus::SkippedByPause)
            .await?;

        record_transition(SubscriptionStatus::Active, SubscriptionStatus::Paused);
        info!(subscription_id = %id, %paused_from, paused_orders, "Subscription paused");

        Ok(PauseOutcome {
            subscription: self.load(id).await?,
            paused_orders,
        })
    }

    /// `paused → active`.
    ///
    /// Paused meals from the resume point onward are rescheduled; earlier
    /// ones are credited. Without `resume_on`, the resume point is the first
    /// paused delivery still outside the notice window.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn resume(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        resume_on: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<ResumeOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        authorize_manage(actor, &sub)?;
        if sub.status != SubscriptionStatus::Paused {
            return Err(invalid_transition(sub.status, "resume"));
        }

        let today = settings.local_date(now);
        let notice = settings.resume_notice_hours;

        let paused: Vec<(Order, DateTime<Utc>)> = self
            .timed_orders(&sub, &settings)
            .await?
            .into_iter()
            .filter(|(o, _)| o.status == OrderStatus::SkippedByPause)
            .collect();

        let boundary = match resume_on {
            Some(date) => {
                if date < today {
                    return Err(LifecycleError::validation("resume date is in the past"));
                }
                let first = paused.iter().find(|(o, _)| o.service_date >= date);
                if let Some((_, at)) = first {
                    ensure_lead_time(now, *at, notice)?;
                }
                first.map(|(_, at)| *at)
            }
            None => {
                let earliest = now + Duration::hours(i64::from(notice));
                paused.iter().find(|(_, at)| *at >= earliest).map(|(_, at)| *at)
            }
        };

        let resumed_on = resume_on
            .or_else(|| boundary.map(|at| settings.local_date(at)))
            .unwrap_or(today);

        let (reactivate, left_behind): (Vec<_>, Vec<_>) = paused
            .iter()
            .partition(|(_, at)| boundary.is_some_and(|b| *at >= b));

        if !self.stores.subscriptions.mark_resumed(id.0).await? {
            return Err(lost_race());
        }

        let reactivate_ids: Vec<Uuid> = reactivate.iter().map(|(o, _)| o.id.0).collect();
        let reactivated_orders = self
            .stores
            .orders
            .transition_many(
                &reactivate_ids,
                OrderStatus::SkippedByPause,
                OrderStatus::Scheduled,
            )
            .await?;

        let left_ids: Vec<Uuid> = left_behind.iter().map(|(o, _)| o.id.0).collect();
        let settled = self
            .stores
            .orders
            .transition_many(&left_ids, OrderStatus::SkippedByPause, OrderStatus::Cancelled)
            .await?;
        if settled != left_ids.len() as u64 {
            warn!(
                subscription_id = %id,
                expected = left_ids.len(),
                settled,
                "Paused orders changed during resume"
            );
        }

        let owed: i64 = left_behind.iter().map(|(o, _)| o.price).sum();
        let credit = if owed > 0 {
            Some(
                self.ledger
                    .mint(
                        sub.consumer_id,
                        Some(id),
                        owed,
                        CreditSource::Pause,
                        settings.credit_expiry(now),
                    )
                    .await?,
            )
        } else {
            None
        };

        record_transition(SubscriptionStatus::Paused, SubscriptionStatus::Active);
        info!(subscription_id = %id, %resumed_on, reactivated_orders, owed, "Subscription resumed");

        Ok(ResumeOutcome {
            subscription: self.load(id).await?,
            resumed_on,
            reactivated_orders,
            credit,
        })
    }

    /// `{trial, active, paused} → cancelled`, settling the unused balance
    /// under the platform refund policy.
    #[instrument(skip(self, actor, reason), fields(user_id = %actor.user_id))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        reason: Option<String>,
        choice: Option<RefundChoice>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CancelOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        authorize_manage(actor, &sub)?;

        let reason = match reason.map(|r| r.trim().to_string()) {
            Some(r) if r.len() > MAX_REASON_LEN => {
                return Err(LifecycleError::validation(format!(
                    "reason too long (max {MAX_REASON_LEN} chars)"
                )))
            }
            Some(r) if !r.is_empty() => r,
            _ => DEFAULT_CANCEL_REASON.to_string(),
        };

        self.cancel_subscription(
            sub,
            &settings,
            CancelTerms {
                reason,
                choice,
                default_choice: None,
                enforce_notice: true,
            },
            now,
        )
        .await
    }

    /// Apply a customer skip to one scheduled meal
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn apply_skip(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        service_date: NaiveDate,
        slot: Slot,
        now: DateTime<Utc>,
    ) -> LifecycleResult<SkipOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        authorize_manage(actor, &sub)?;
        if !matches!(
            sub.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) {
            return Err(invalid_transition(sub.status, "skip"));
        }

        let (configs, grants_credit) = self.skip_terms(&sub).await?;
        let config = configs
            .iter()
            .find(|c| c.slot == slot)
            .ok_or_else(|| LifecycleError::validation(format!("{slot} is not part of this plan")))?;

        let order: Order = self
            .stores
            .orders
            .find_for_slot(id.0, service_date, slot)
            .await?
            .ok_or(LifecycleError::NotFound("order"))?
            .try_into()?;

        if order.status != OrderStatus::Scheduled {
            return Err(LifecycleError::InvalidTransition {
                from: order.status.to_string(),
                action: "skip",
            });
        }

        let at = settings.delivery_instant(service_date, config.delivery_window_start);
        ensure_lead_time(now, at, config.skip_cutoff_hours)?;

        let limit = i32::try_from(config.skip_limit).unwrap_or(i32::MAX);
        let used = self
            .stores
            .skip_usage
            .try_increment(id.0, order.cycle_start, slot, limit)
            .await?
            .ok_or(LifecycleError::LimitExceeded {
                slot,
                limit: config.skip_limit,
            })?;

        if !self
            .stores
            .orders
            .transition(order.id.0, OrderStatus::Scheduled, OrderStatus::SkippedByCustomer)
            .await?
        {
            self.stores
                .skip_usage
                .release(id.0, order.cycle_start, slot)
                .await?;
            return Err(lost_race());
        }

        let credit = if grants_credit && order.price > 0 {
            Some(
                self.ledger
                    .mint(
                        sub.consumer_id,
                        Some(id),
                        order.price,
                        CreditSource::Skip,
                        settings.credit_expiry(now),
                    )
                    .await?,
            )
        } else {
            None
        };

        let used = u32::try_from(used).unwrap_or(0);
        metrics::counter!("skips_applied_total", "slot" => slot.as_str()).increment(1);
        info!(subscription_id = %id, %service_date, %slot, used, "Meal skipped");

        Ok(SkipOutcome {
            order: Order {
                status: OrderStatus::SkippedByCustomer,
                ..order
            },
            used,
            remaining: config.skip_limit.saturating_sub(used),
            credit,
        })
    }

    /// Whether a subscription is past the platform's pause limit
    pub async fn auto_cancel_eligible(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<bool> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        Ok(auto_cancel_eligible(&sub, &settings, settings.local_date(now)))
    }

    /// Cancel a subscription paused longer than `max_pause_days`.
    ///
    /// Skips the notice window. Under a customer-choice policy the balance
    /// goes back as credit.
    #[instrument(skip(self))]
    pub async fn force_cancel(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CancelOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        if !auto_cancel_eligible(&sub, &settings, settings.local_date(now)) {
            if sub.status != SubscriptionStatus::Paused {
                return Err(invalid_transition(sub.status, "force-cancel"));
            }
            return Err(LifecycleError::validation(
                "pause is still within the allowed length",
            ));
        }
        self.force_cancel_loaded(sub, &settings, now).await
    }

    /// End bounded pauses that have run their course, then force-cancel
    /// every subscription still paused past the limit
    #[instrument(skip(self))]
    pub async fn sweep_overlong_pauses(&self, now: DateTime<Utc>) -> LifecycleResult<SweepReport> {
        let settings = self.settings().await?;
        let today = settings.local_date(now);
        let cutoff = pause_cutoff(&settings, today);

        let mut report = SweepReport::default();
        for row in self.stores.subscriptions.find_pauses_ended_before(today).await? {
            let sub = Subscription::try_from(row)?;
            let id = sub.id;
            match self.end_lapsed_pause(sub, &settings, now).await {
                Ok(_) => report.resumed.push(id),
                Err(e) => {
                    warn!(subscription_id = %id, error = %e, "Ending pause failed");
                    report.failed.push(id);
                }
            }
        }

        for row in self
            .stores
            .subscriptions
            .find_paused_before(cutoff, today)
            .await?
        {
            let sub = Subscription::try_from(row)?;
            let id = sub.id;
            match self.force_cancel_loaded(sub, &settings, now).await {
                Ok(_) => report.cancelled.push(id),
                Err(e) => {
                    warn!(subscription_id = %id, error = %e, "Auto-cancel failed");
                    report.failed.push(id);
                }
            }
        }

        info!(
            resumed = report.resumed.len(),
            cancelled = report.cancelled.len(),
            failed = report.failed.len(),
            "Pause sweep finished"
        );
        Ok(report)
    }

    async fn force_cancel_loaded(
        &self,
        sub: Subscription,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CancelOutcome> {
        let reason = format!("paused longer than {} days", settings.max_pause_days);
        self.cancel_subscription(
            sub,
            settings,
            CancelTerms {
                reason,
                choice: None,
                default_choice: Some(RefundChoice::Credit),
                enforce_notice: false,
            },
            now,
        )
        .await
    }

    async fn cancel_subscription(
        &self,
        sub: Subscription,
        settings: &PlatformSettings,
        terms: CancelTerms,
        now: DateTime<Utc>,
    ) -> LifecycleResult<CancelOutcome> {
        if !sub.status.can_transition(SubscriptionStatus::Cancelled) {
            return Err(invalid_transition(sub.status, "cancel"));
        }

        let timed = self.timed_orders(&sub, settings).await?;

        if terms.enforce_notice {
            if let Some((_, at)) = timed
                .iter()
                .find(|(o, at)| o.status == OrderStatus::Scheduled && *at > now)
            {
                ensure_lead_time(now, *at, settings.cancel_notice_hours)?;
            }
        }

        let mut scheduled = Vec::new();
        let mut paused = Vec::new();
        let mut balance = 0;
        for (order, at) in &timed {
            match order.status {
                OrderStatus::Scheduled if *at > now => scheduled.push(order.id.0),
                OrderStatus::SkippedByPause => paused.push(order.id.0),
                _ => continue,
            }
            balance += order.price;
        }

        let method = if balance > 0 {
            Some(policy::resolve(
                settings.refund_policy,
                terms.choice,
                terms.default_choice,
            )?)
        } else {
            None
        };

        let from = sub.status;
        if !self
            .stores
            .subscriptions
            .mark_cancelled(CancelSubscription {
                id: sub.id.0,
                from,
                reason: terms.reason.clone(),
                cancelled_at: now,
                expiry_date: settings.local_date(now),
            })
            .await?
        {
            return Err(lost_race());
        }

        self.stores
            .orders
            .transition_many(&scheduled, OrderStatus::Scheduled, OrderStatus::Cancelled)
            .await?;
        self.stores
            .orders
            .transition_many(&paused, OrderStatus::SkippedByPause, OrderStatus::Cancelled)
            .await?;

        let settlement = match method {
            None => Settlement::Nothing,
            Some(SettlementMethod::Credit) => Settlement::Credited {
                credit: self
                    .ledger
                    .mint(
                        sub.consumer_id,
                        Some(sub.id),
                        balance,
                        CreditSource::Cancellation,
                        settings.credit_expiry(now),
                    )
                    .await?,
            },
            Some(SettlementMethod::Refund) => self.refund(&sub, balance).await,
        };

        record_transition(from, SubscriptionStatus::Cancelled);
        info!(
            subscription_id = %sub.id,
            %from,
            balance,
            reason = %terms.reason,
            "Subscription cancelled"
        );

        Ok(CancelOutcome {
            subscription: self.load(sub.id).await?,
            balance,
            settlement,
        })
    }

    /// Refund through the gateway; failures leave the refund pending
    async fn refund(&self, sub: &Subscription, amount: i64) -> Settlement {
        let Some(payment_id) = sub.payment_id.as_deref() else {
            error!(subscription_id = %sub.id, amount, "No captured payment to refund");
            return Settlement::RefundPending { amount };
        };

        let notes = HashMap::from([("subscription_id".to_string(), sub.id.to_string())]);
        match self.gateway.refund(payment_id, amount, notes).await {
            Ok(refund) => Settlement::Refunded {
                amount,
                refund_id: refund.id,
            },
            Err(e) => {
                error!(subscription_id = %sub.id, amount, error = %e, "Refund failed");
                Settlement::RefundPending { amount }
            }
        }
    }

    /// Load a subscription, first ending a bounded pause whose last day has
    /// passed
    pub(crate) async fn load_current(
        &self,
        id: SubscriptionId,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Subscription> {
        let sub = self.load(id).await?;
        self.end_lapsed_pause(sub, settings, now).await
    }

    /// `paused → active` once `paused_until` is behind us.
    ///
    /// Deliveries after `paused_until` were never suspended. The meals the
    /// pause did suppress are settled as left behind: cancelled and credited.
    async fn end_lapsed_pause(
        &self,
        sub: Subscription,
        settings: &PlatformSettings,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Subscription> {
        if !pause_has_ended(&sub, settings.local_date(now)) {
            return Ok(sub);
        }

        if !self.stores.subscriptions.mark_resumed(sub.id.0).await? {
            // Ended by a concurrent request
            return self.load(sub.id).await;
        }

        let paused: Vec<Order> = self
            .orders(sub.id)
            .await?
            .into_iter()
            .filter(|o| o.status == OrderStatus::SkippedByPause)
            .collect();
        let ids: Vec<Uuid> = paused.iter().map(|o| o.id.0).collect();
        self.stores
            .orders
            .transition_many(&ids, OrderStatus::SkippedByPause, OrderStatus::Cancelled)
            .await?;

        let owed: i64 = paused.iter().map(|o| o.price).sum();
        if owed > 0 {
            self.ledger
                .mint(
                    sub.consumer_id,
                    Some(sub.id),
                    owed,
                    CreditSource::Pause,
                    settings.credit_expiry(now),
                )
                .await?;
        }

        record_transition(SubscriptionStatus::Paused, SubscriptionStatus::Active);
        info!(
            subscription_id = %sub.id,
            paused_until = ?sub.paused_until,
            owed,
            "Bounded pause ended"
        );

        self.load(sub.id).await
    }

    pub(crate) async fn load(&self, id: SubscriptionId) -> LifecycleResult<Subscription> {
        Ok(self
            .stores
            .subscriptions
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::NotFound("subscription"))?
            .try_into()?)
    }

    pub(crate) async fn load_plan(&self, id: PlanId) -> LifecycleResult<Plan> {
        Ok(self
            .stores
            .plans
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::NotFound("plan"))?
            .try_into()?)
    }

    pub(crate) async fn view(&self, subscription: Subscription) -> LifecycleResult<SubscriptionView> {
        let orders = self.orders(subscription.id).await?;
        Ok(SubscriptionView {
            subscription,
            orders,
        })
    }

    async fn orders(&self, id: SubscriptionId) -> LifecycleResult<Vec<Order>> {
        self.stores
            .orders
            .find_by_subscription(id.0)
            .await?
            .into_iter()
            .map(|row| Order::try_from(row).map_err(LifecycleError::from))
            .collect()
    }

    /// Orders paired with their delivery instants, soonest first
    async fn timed_orders(
        &self,
        sub: &Subscription,
        settings: &PlatformSettings,
    ) -> LifecycleResult<Vec<(Order, DateTime<Utc>)>> {
        let (configs, _) = self.skip_terms(sub).await?;
        let mut timed: Vec<_> = self
            .orders(sub.id)
            .await?
            .into_iter()
            .map(|o| {
                let at = delivery_instant(settings, &configs, &o);
                (o, at)
            })
            .collect();
        timed.sort_by_key(|(_, at)| *at);
        Ok(timed)
    }

    /// Slot configuration in force and whether skips earn credit.
    ///
    /// Trials take their trial type's slots with no skips allowed.
    async fn skip_terms(&self, sub: &Subscription) -> LifecycleResult<(Vec<SlotConfig>, bool)> {
        if sub.status == SubscriptionStatus::Trial || sub.plan_id.is_none() {
            let trial_id = sub
                .trial_type_id
                .ok_or_else(|| LifecycleError::Internal("trial without trial type".into()))?;
            let trial: TrialType = self
                .stores
                .trial_types
                .find_by_id(trial_id.0)
                .await?
                .ok_or(LifecycleError::NotFound("trial type"))?
                .try_into()?;
            let slots = trial
                .slots
                .into_iter()
                .map(|c| SlotConfig {
                    skip_limit: 0,
                    ..c
                })
                .collect();
            return Ok((slots, false));
        }

        let plan_id = sub
            .plan_id
            .ok_or_else(|| LifecycleError::Internal("subscription without plan".into()))?;
        let plan = self.load_plan(plan_id).await?;
        Ok((plan.slots, plan.grants_skip_credit))
    }
}

/// Customers manage their own subscriptions; admins manage any
pub(crate) fn authorize_manage(actor: &Actor, sub: &Subscription) -> LifecycleResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Customer if actor.user_id == sub.consumer_id => Ok(()),
        _ => Err(LifecycleError::Unauthorized("subscription")),
    }
}

/// Owners, their vendor and admins may read a subscription
fn authorize_view(actor: &Actor, sub: &Subscription) -> LifecycleResult<()> {
    match actor.role {
        Role::Vendor if actor.user_id == sub.vendor_id => Ok(()),
        _ => authorize_manage(actor, sub),
    }
}

pub(crate) fn invalid_transition(from: SubscriptionStatus, action: &'static str) -> LifecycleError {
    LifecycleError::InvalidTransition {
        from: from.to_string(),
        action,
    }
}

pub(crate) fn lost_race() -> LifecycleError {
    LifecycleError::Conflict("subscription changed concurrently; retry".to_string())
}

pub(crate) fn record_transition(from: SubscriptionStatus, to: SubscriptionStatus) {
    metrics::counter!(
        "lifecycle_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}
