//! Paid lifecycle operations: checkout, subscribe, trials, renewal, expiry

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tiffin_db::{AdvanceCycle, ConvertTrial, CreateSubscription};
use tiffin_types::{
    Actor, AddressId, MealPreference, Plan, PlanId, Role, Subscription, SubscriptionId,
    SubscriptionStatus, TrialType, TrialTypeId, UserId,
};

use crate::error::{LifecycleError, LifecycleResult};
use crate::gateway::{GatewayOrder, OrderRequest, PaymentConfirmation};
use crate::ledger::Redemption;
use crate::schedule::{build_cycle, validate_preferences, CyclePricing};
use crate::service::{
    authorize_manage, invalid_transition, lost_race, record_transition, LifecycleService,
    SubscriptionView,
};
use crate::webhook::verify_payment_signature;

/// Renewal may run this many days before the cycle ends
pub const RENEWAL_LEAD_DAYS: i64 = 2;

/// Furthest ahead a new subscription or trial may start
pub const MAX_START_DAYS_AHEAD: i64 = 30;

/// What a checkout is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CheckoutItem {
    /// First cycle of a plan
    Plan(PlanId),
    /// A trial
    Trial(TrialTypeId),
}

/// Checkout request
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Plan or trial being bought
    pub item: CheckoutItem,
    /// Chosen slots
    pub meal_preferences: Vec<MealPreference>,
    /// First service day
    pub start_date: NaiveDate,
}

/// Priced checkout with the gateway order to pay
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    /// Price of the first cycle
    pub price: i64,
    /// Gateway order the customer pays
    pub gateway_order: GatewayOrder,
}

/// Subscribe request
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    /// Plan to subscribe to
    pub plan_id: PlanId,
    /// Delivery address
    pub address_id: AddressId,
    /// Chosen slots
    pub meal_preferences: Vec<MealPreference>,
    /// First service day
    pub start_date: NaiveDate,
    /// Checkout payment
    pub payment: PaymentConfirmation,
}

/// Trial request
#[derive(Debug, Clone, Deserialize)]
pub struct TrialRequest {
    /// Trial type
    pub trial_type_id: TrialTypeId,
    /// Vendor whose food is trialled
    pub vendor_id: UserId,
    /// Delivery address
    pub address_id: AddressId,
    /// Chosen slots
    pub meal_preferences: Vec<MealPreference>,
    /// First service day
    pub start_date: NaiveDate,
    /// Checkout payment; not needed for free trials
    pub payment: Option<PaymentConfirmation>,
}

/// Trial conversion request
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    /// Plan to continue on
    pub plan_id: PlanId,
    /// New slot selection; defaults to the trial's
    pub meal_preferences: Option<Vec<MealPreference>>,
    /// Payment for the first paid cycle
    pub payment: PaymentConfirmation,
}

/// Captured payment funding a renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalPayment {
    /// Gateway payment ID
    pub payment_id: String,
    /// Captured amount
    pub amount: i64,
}

/// Next-cycle price and how much of it credit covers
#[derive(Debug, Clone, Serialize)]
pub struct RenewalQuote {
    /// Subscription being renewed
    pub subscription_id: SubscriptionId,
    /// First day of the next cycle
    pub cycle_start: NaiveDate,
    /// Price of the next cycle
    pub price: i64,
    /// Redeemable credit
    pub credit_available: i64,
    /// Credit that will be applied
    pub credit_applied: i64,
    /// Amount the customer must pay
    pub amount_due: i64,
    /// Gateway order for `amount_due`, when anything is due
    pub gateway_order: Option<GatewayOrder>,
}

/// Result of a renewal
#[derive(Debug, Clone, Serialize)]
pub struct RenewalOutcome {
    /// Renewed subscription
    pub subscription: Subscription,
    /// Orders created for the new cycle
    pub orders_created: u64,
    /// Credit redeemed toward the cycle
    pub redemption: Redemption,
}

impl LifecycleService {
    /// Price a first cycle and open a gateway order for it
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Checkout> {
        require_customer(actor)?;
        let settings = self.settings().await?;
        validate_start(request.start_date, settings.local_date(now))?;

        let slots: Vec<_> = request.meal_preferences.iter().map(|p| p.slot).collect();
        let (price, notes) = match request.item {
            CheckoutItem::Plan(plan_id) => {
                let plan = self.open_plan(plan_id).await?;
                validate_preferences(&request.meal_preferences, &plan.slots)?;
                let end = plan.period.cycle_end(request.start_date);
                let schedule = build_cycle(
                    Uuid::nil(),
                    &slots,
                    request.start_date,
                    end,
                    CyclePricing::Plan(&plan),
                )?;
                (schedule.price, ("plan_id", plan_id.to_string()))
            }
            CheckoutItem::Trial(trial_id) => {
                let trial = self.open_trial(trial_id).await?;
                validate_preferences(&request.meal_preferences, &trial.slots)?;
                (trial.price, ("trial_type_id", trial_id.to_string()))
            }
        };

        if price <= 0 {
            return Err(LifecycleError::validation("nothing to pay for"));
        }

        let gateway_order = self
            .gateway
            .create_order(OrderRequest {
                amount: price,
                receipt: format!("chk_{}", Uuid::new_v4().simple()),
                notes: HashMap::from([
                    ("consumer_id".to_string(), actor.user_id.to_string()),
                    (notes.0.to_string(), notes.1),
                ]),
            })
            .await?;

        info!(price, gateway_order_id = %gateway_order.id, "Checkout opened");
        Ok(Checkout {
            price,
            gateway_order,
        })
    }

    /// Create an active subscription funded by a verified checkout payment
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn subscribe(
        &self,
        actor: &Actor,
        request: SubscribeRequest,
        now: DateTime<Utc>,
    ) -> LifecycleResult<SubscriptionView> {
        require_customer(actor)?;
        let plan = self.open_plan(request.plan_id).await?;
        validate_preferences(&request.meal_preferences, &plan.slots)?;
        let settings = self.settings().await?;
        validate_start(request.start_date, settings.local_date(now))?;
        verify_payment_signature(&self.key_secret, &request.payment)?;

        let id = SubscriptionId::new();
        let end = plan.period.cycle_end(request.start_date);
        let slots: Vec<_> = request.meal_preferences.iter().map(|p| p.slot).collect();
        let schedule = build_cycle(id.0, &slots, request.start_date, end, CyclePricing::Plan(&plan))?;

        self.stores
            .subscriptions
            .create(CreateSubscription {
                id: id.0,
                consumer_id: actor.user_id.0,
                vendor_id: plan.vendor_id.0,
                plan_id: Some(plan.id.0),
                trial_type_id: None,
                address_id: request.address_id.0,
                status: SubscriptionStatus::Active,
                start_date: request.start_date,
                renewal_date: end,
                price: schedule.price,
                meal_preferences: request.meal_preferences,
                payment_id: Some(request.payment.payment_id),
            })
            .await?;
        self.stores.orders.create_many(&schedule.orders).await?;

        metrics::counter!("lifecycle_transitions_total", "from" => "new", "to" => "active")
            .increment(1);
        info!(subscription_id = %id, plan_id = %plan.id, price = schedule.price, "Subscribed");

        let sub = self.load(id).await?;
        self.view(sub).await
    }

    /// Start a paid (or free) trial of a vendor's food
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn start_trial(
        &self,
        actor: &Actor,
        request: TrialRequest,
        now: DateTime<Utc>,
    ) -> LifecycleResult<SubscriptionView> {
        require_customer(actor)?;
        let trial = self.open_trial(request.trial_type_id).await?;
        if trial.vendor_id.is_some_and(|v| v != request.vendor_id) {
            return Err(LifecycleError::validation(
                "trial type is not offered by this vendor",
            ));
        }
        validate_preferences(&request.meal_preferences, &trial.slots)?;
        let settings = self.settings().await?;
        validate_start(request.start_date, settings.local_date(now))?;

        let payment_id = match request.payment {
            Some(payment) => {
                verify_payment_signature(&self.key_secret, &payment)?;
                Some(payment.payment_id)
            }
            None if trial.price == 0 => None,
            None => return Err(LifecycleError::validation("payment is required")),
        };

        let id = SubscriptionId::new();
        let end = request.start_date + Duration::days(i64::from(trial.duration_days));
        let slots: Vec<_> = request.meal_preferences.iter().map(|p| p.slot).collect();
        let schedule =
            build_cycle(id.0, &slots, request.start_date, end, CyclePricing::Flat(trial.price))?;

        self.stores
            .subscriptions
            .create(CreateSubscription {
                id: id.0,
                consumer_id: actor.user_id.0,
                vendor_id: request.vendor_id.0,
                plan_id: None,
                trial_type_id: Some(trial.id.0),
                address_id: request.address_id.0,
                status: SubscriptionStatus::Trial,
                start_date: request.start_date,
                renewal_date: end,
                price: schedule.price,
                meal_preferences: request.meal_preferences,
                payment_id,
            })
            .await?;
        self.stores.orders.create_many(&schedule.orders).await?;

        metrics::counter!("lifecycle_transitions_total", "from" => "new", "to" => "trial")
            .increment(1);
        info!(subscription_id = %id, trial_type_id = %trial.id, "Trial started");

        let sub = self.load(id).await?;
        self.view(sub).await
    }

    /// `trial → active` on a plan of the same vendor.
    ///
    /// The first paid cycle starts when the trial ends, or today if the trial
    /// is already over.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn convert_trial(
        &self,
        actor: &Actor,
        id: SubscriptionId,
        request: ConvertRequest,
        now: DateTime<Utc>,
    ) -> LifecycleResult<SubscriptionView> {
        let sub = self.load(id).await?;
        authorize_manage(actor, &sub)?;
        if sub.status != SubscriptionStatus::Trial {
            return Err(invalid_transition(sub.status, "convert"));
        }

        let plan = self.open_plan(request.plan_id).await?;
        if plan.vendor_id != sub.vendor_id {
            return Err(LifecycleError::validation("plan belongs to another vendor"));
        }
        let preferences = request
            .meal_preferences
            .unwrap_or_else(|| sub.meal_preferences.clone());
        validate_preferences(&preferences, &plan.slots)?;
        verify_payment_signature(&self.key_secret, &request.payment)?;

        let settings = self.settings().await?;
        let cycle_start = sub.renewal_date.max(settings.local_date(now));
        let end = plan.period.cycle_end(cycle_start);
        let slots: Vec<_> = preferences.iter().map(|p| p.slot).collect();
        let schedule = build_cycle(id.0, &slots, cycle_start, end, CyclePricing::Plan(&plan))?;

        if !self
            .stores
            .subscriptions
            .convert_trial(ConvertTrial {
                id: id.0,
                plan_id: plan.id.0,
                cycle_start,
                renewal_date: end,
                price: schedule.price,
                meal_preferences: preferences,
                payment_id: request.payment.payment_id,
            })
            .await?
        {
            return Err(lost_race());
        }
        self.stores.orders.create_many(&schedule.orders).await?;

        record_transition(SubscriptionStatus::Trial, SubscriptionStatus::Active);
        info!(subscription_id = %id, plan_id = %plan.id, %cycle_start, "Trial converted");

        let sub = self.load(id).await?;
        self.view(sub).await
    }

    /// Price the next cycle and open a gateway order for whatever credit
    /// does not cover
    #[instrument(skip(self))]
    pub async fn quote_renewal(
        &self,
        id: SubscriptionId,
        now: DateTime<Utc>,
    ) -> LifecycleResult<RenewalQuote> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        if sub.status != SubscriptionStatus::Active {
            return Err(invalid_transition(sub.status, "renew"));
        }
        let plan = self.subscription_plan(&sub).await?;
        let cycle_start = sub.renewal_date.max(settings.local_date(now));
        let schedule = build_cycle(
            id.0,
            &sub.slots(),
            cycle_start,
            plan.period.cycle_end(cycle_start),
            CyclePricing::Plan(&plan),
        )?;

        let credit_available = self.ledger.balance(sub.consumer_id, now).await?;
        let credit_applied = credit_available.min(schedule.price);
        let amount_due = schedule.price - credit_applied;

        let gateway_order = if amount_due > 0 {
            Some(
                self.gateway
                    .create_order(OrderRequest {
                        amount: amount_due,
                        receipt: format!("ren_{}", Uuid::new_v4().simple()),
                        notes: HashMap::from([(
                            "subscription_id".to_string(),
                            id.to_string(),
                        )]),
                    })
                    .await?,
            )
        } else {
            None
        };

        Ok(RenewalQuote {
            subscription_id: id,
            cycle_start,
            price: schedule.price,
            credit_available,
            credit_applied,
            amount_due,
            gateway_order,
        })
    }

    /// Advance an active subscription into its next cycle.
    ///
    /// Whatever `payment` does not cover is redeemed from credit before the
    /// cycle advances. The renewal is refused, and the redemption reversed,
    /// if credit cannot cover the shortfall or the cycle moved underneath.
    #[instrument(skip(self))]
    pub async fn renew(
        &self,
        id: SubscriptionId,
        payment: Option<RenewalPayment>,
        now: DateTime<Utc>,
    ) -> LifecycleResult<RenewalOutcome> {
        let settings = self.settings().await?;
        let sub = self.load_current(id, &settings, now).await?;
        if sub.status != SubscriptionStatus::Active {
            return Err(invalid_transition(sub.status, "renew"));
        }

        let today = settings.local_date(now);
        if today + Duration::days(RENEWAL_LEAD_DAYS) < sub.renewal_date {
            return Err(LifecycleError::validation(format!(
                "renewal is not due before {}",
                sub.renewal_date - Duration::days(RENEWAL_LEAD_DAYS)
            )));
        }

        let plan = self.subscription_plan(&sub).await?;
        let cycle_start = sub.renewal_date.max(today);
        let end = plan.period.cycle_end(cycle_start);
        let schedule = build_cycle(id.0, &sub.slots(), cycle_start, end, CyclePricing::Plan(&plan))?;

        let paid = payment.as_ref().map_or(0, |p| p.amount);
        let shortfall = (schedule.price - paid).max(0);
        let redemption = self.ledger.redeem(sub.consumer_id, shortfall, now).await?;
        if redemption.applied < shortfall {
            self.ledger.reverse(&redemption).await?;
            return Err(LifecycleError::validation(format!(
                "renewal is short by {}",
                shortfall - redemption.applied
            )));
        }

        let advanced = self
            .stores
            .subscriptions
            .advance_cycle(AdvanceCycle {
                id: id.0,
                expected_cycle_start: sub.cycle_start,
                cycle_start,
                renewal_date: end,
                price: schedule.price,
                payment_id: payment.map(|p| p.payment_id),
            })
            .await;
        match advanced {
            Ok(true) => {}
            Ok(false) => {
                warn!(subscription_id = %id, "Cycle moved during renewal; reversing credit");
                self.ledger.reverse(&redemption).await?;
                return Err(LifecycleError::Conflict(
                    "subscription was already renewed or changed".to_string(),
                ));
            }
            Err(e) => {
                self.ledger.reverse(&redemption).await?;
                return Err(e.into());
            }
        }

        let orders_created = self.stores.orders.create_many(&schedule.orders).await?;

        info!(
            subscription_id = %id,
            %cycle_start,
            price = schedule.price,
            paid,
            credit = redemption.applied,
            "Subscription renewed"
        );

        Ok(RenewalOutcome {
            subscription: self.load(id).await?,
            orders_created,
            redemption,
        })
    }

    /// `active → expired` after a failed renewal payment
    #[instrument(skip(self))]
    pub async fn expire(&self, id: SubscriptionId) -> LifecycleResult<Subscription> {
        let sub = self.load(id).await?;
        if sub.status != SubscriptionStatus::Active {
            return Err(invalid_transition(sub.status, "expire"));
        }

        let last_day = sub.renewal_date.pred_opt().unwrap_or(sub.renewal_date);
        if !self.stores.subscriptions.mark_expired(id.0, last_day).await? {
            return Err(lost_race());
        }

        record_transition(SubscriptionStatus::Active, SubscriptionStatus::Expired);
        info!(subscription_id = %id, %last_day, "Subscription expired");

        self.load(id).await
    }

    async fn open_plan(&self, id: PlanId) -> LifecycleResult<Plan> {
        let plan = self.load_plan(id).await?;
        if !plan.active {
            return Err(LifecycleError::validation(
                "plan is not accepting subscribers",
            ));
        }
        Ok(plan)
    }

    async fn open_trial(&self, id: TrialTypeId) -> LifecycleResult<TrialType> {
        let trial: TrialType = self
            .stores
            .trial_types
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::NotFound("trial type"))?
            .try_into()?;
        if !trial.active {
            return Err(LifecycleError::validation("trial type is not available"));
        }
        Ok(trial)
    }

    async fn subscription_plan(&self, sub: &Subscription) -> LifecycleResult<Plan> {
        let plan_id = sub
            .plan_id
            .ok_or_else(|| LifecycleError::Internal("active subscription without plan".into()))?;
        self.load_plan(plan_id).await
    }
}

fn require_customer(actor: &Actor) -> LifecycleResult<()> {
    if actor.role != Role::Customer {
        return Err(LifecycleError::Unauthorized("subscription"));
    }
    Ok(())
}

fn validate_start(start: NaiveDate, today: NaiveDate) -> LifecycleResult<()> {
    if start <= today {
        return Err(LifecycleError::validation("start date must be after today"));
    }
    if start > today + Duration::days(MAX_START_DAYS_AHEAD) {
        return Err(LifecycleError::validation(format!(
            "start date must be within {MAX_START_DAYS_AHEAD} days"
        )));
    }
    Ok(())
}
