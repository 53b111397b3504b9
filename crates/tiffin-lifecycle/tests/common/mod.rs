//! Common test utilities for tiffin-lifecycle integration tests

pub mod mock_repos;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tiffin_db::SettingsRepository;
use tiffin_lifecycle::webhook::sign;
use tiffin_lifecycle::{
    Catalog, LifecycleService, NewPlan, NewTrialType, PaymentConfirmation, Stores,
    SubscribeRequest, TrialRequest,
};
use tiffin_types::{
    Actor, AddressId, MealPreference, Plan, PlanPeriod, PlatformSettings, PricingMode, Role, Slot,
    SlotConfig, Subscription, TrialType, UserId,
};

#[allow(unused_imports)]
pub use mock_repos::{
    MockCreditRepository, MockGateway, MockOrderRepository, MockPlanRepository,
    MockSettingsRepository, MockSkipUsageRepository, MockSubscriptionRepository,
    MockTrialTypeRepository,
};

pub const KEY_SECRET: &str = "rzp_test_secret";

/// Lunch base price; plans take 10% off, so a meal costs 9000
pub const LUNCH_PRICE: i64 = 10_000;
pub const MEAL_PRICE: i64 = 9_000;

/// First service day of every fixture subscription (a Monday)
#[allow(dead_code)]
pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

#[allow(dead_code)]
pub fn day(offset: i64) -> NaiveDate {
    start() + Duration::days(offset)
}

/// UTC instant of a local wall-clock time under the default settings
#[allow(dead_code)]
pub fn local(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    PlatformSettings::default().delivery_instant(date, NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
}

/// Lunch delivery instant on `date`
#[allow(dead_code)]
pub fn lunch(date: NaiveDate) -> DateTime<Utc> {
    local(date, 12, 30)
}

/// Checkout confirmation signed with the test key
#[allow(dead_code)]
pub fn signed_payment(order_id: &str, payment_id: &str) -> PaymentConfirmation {
    let message = format!("{order_id}|{payment_id}");
    PaymentConfirmation {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: sign(KEY_SECRET.as_bytes(), message.as_bytes()).unwrap(),
    }
}

#[allow(dead_code)]
pub fn lunch_config(skip_limit: u32, skip_cutoff_hours: u32) -> SlotConfig {
    SlotConfig {
        slot: Slot::Lunch,
        base_price: LUNCH_PRICE,
        skip_limit,
        skip_cutoff_hours,
        delivery_window_start: NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
    }
}

/// Service wired to in-memory stores and a recording gateway
pub struct World {
    pub service: LifecycleService,
    pub catalog: Catalog,
    pub subscriptions: MockSubscriptionRepository,
    pub orders: MockOrderRepository,
    pub credits: MockCreditRepository,
    pub gateway: MockGateway,
    pub vendor: UserId,
    pub customer: UserId,
}

#[allow(dead_code)]
impl World {
    pub async fn new() -> Self {
        Self::with_settings(PlatformSettings::default()).await
    }

    pub async fn with_settings(settings: PlatformSettings) -> Self {
        let subscriptions = MockSubscriptionRepository::default();
        let orders = MockOrderRepository::default();
        let credits = MockCreditRepository::default();
        let settings_repo = MockSettingsRepository::default();
        settings_repo.save(&settings).await.unwrap();
        let gateway = MockGateway::default();

        let stores = Stores {
            subscriptions: Arc::new(subscriptions.clone()),
            orders: Arc::new(orders.clone()),
            credits: Arc::new(credits.clone()),
            plans: Arc::new(MockPlanRepository::default()),
            trial_types: Arc::new(MockTrialTypeRepository::default()),
            settings: Arc::new(settings_repo),
            skip_usage: Arc::new(MockSkipUsageRepository::default()),
        };

        Self {
            service: LifecycleService::new(stores.clone(), Arc::new(gateway.clone()), KEY_SECRET),
            catalog: Catalog::new(stores),
            subscriptions,
            orders,
            credits,
            gateway,
            vendor: UserId::new(),
            customer: UserId::new(),
        }
    }

    pub fn customer(&self) -> Actor {
        Actor::customer(self.customer)
    }

    pub fn vendor(&self) -> Actor {
        Actor::new(self.vendor, Role::Vendor)
    }

    pub fn admin(&self) -> Actor {
        Actor::admin(UserId::new())
    }

    /// Weekly lunch plan at 10% off
    pub async fn plan(&self, skip_limit: u32, grants_skip_credit: bool) -> Plan {
        self.catalog
            .create_plan(
                &self.vendor(),
                NewPlan {
                    vendor_id: None,
                    name: "Weekday Lunch".to_string(),
                    period: PlanPeriod::Weekly,
                    slots: vec![lunch_config(skip_limit, 12)],
                    pricing: PricingMode::PerMealDiscount { percent: 10 },
                    grants_skip_credit,
                },
                local(start(), 9, 0) - Duration::days(7),
            )
            .await
            .unwrap()
    }

    /// Active subscription to `plan` starting on [`start`], paid with `pay_1`
    pub async fn subscribe(&self, plan: &Plan) -> Subscription {
        self.service
            .subscribe(
                &self.customer(),
                SubscribeRequest {
                    plan_id: plan.id,
                    address_id: AddressId::new(),
                    meal_preferences: vec![MealPreference {
                        slot: Slot::Lunch,
                        note: None,
                    }],
                    start_date: start(),
                    payment: signed_payment("order_1", "pay_1"),
                },
                local(day(-1), 9, 0),
            )
            .await
            .unwrap()
            .subscription
    }

    /// Active subscription on a fresh plan with skip limit 2
    pub async fn active(&self) -> Subscription {
        let plan = self.plan(2, false).await;
        self.subscribe(&plan).await
    }

    /// Free lunch trial type offered by the fixture vendor
    pub async fn trial_type(&self, duration_days: u32, price: i64) -> TrialType {
        self.catalog
            .create_trial_type(
                &self.admin(),
                NewTrialType {
                    vendor_id: Some(self.vendor),
                    name: "Taster".to_string(),
                    duration_days,
                    price,
                    slots: vec![lunch_config(3, 12)],
                },
                local(day(-7), 9, 0),
            )
            .await
            .unwrap()
    }

    /// Trial subscription starting on [`start`]
    pub async fn trial(&self, trial: &TrialType) -> Subscription {
        let payment = (trial.price > 0).then(|| signed_payment("order_t", "pay_t"));
        self.service
            .start_trial(
                &self.customer(),
                TrialRequest {
                    trial_type_id: trial.id,
                    vendor_id: self.vendor,
                    address_id: AddressId::new(),
                    meal_preferences: vec![MealPreference {
                        slot: Slot::Lunch,
                        note: Some("less spicy".to_string()),
                    }],
                    start_date: start(),
                    payment,
                },
                local(day(-1), 9, 0),
            )
            .await
            .unwrap()
            .subscription
    }
}
