//! Checkout, trials, renewal and expiry

mod common;

use chrono::Duration;
use common::{day, local, signed_payment, World, MEAL_PRICE};
use tiffin_lifecycle::{
    CheckoutItem, CheckoutRequest, ConvertRequest, LifecycleError, PaymentConfirmation,
    RenewalPayment, SubscribeRequest,
};
use tiffin_types::{
    AddressId, CreditSource, CreditStatus, MealPreference, OrderStatus, Slot, SubscriptionStatus,
};

fn lunch_only() -> Vec<MealPreference> {
    vec![MealPreference {
        slot: Slot::Lunch,
        note: None,
    }]
}

#[tokio::test]
async fn test_subscribe_creates_a_cycle_of_orders() {
    let world = World::new().await;
    let plan = world.plan(2, false).await;
    let sub = world.subscribe(&plan).await;

    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.cycle_start, day(0));
    assert_eq!(sub.renewal_date, day(7));
    assert_eq!(sub.price, 7 * MEAL_PRICE);
    assert_eq!(sub.payment_id.as_deref(), Some("pay_1"));
    assert_eq!(world.orders.count(sub.id.0, OrderStatus::Scheduled), 7);
}

#[tokio::test]
async fn test_subscribe_with_forged_signature_is_rejected() {
    let world = World::new().await;
    let plan = world.plan(2, false).await;

    let result = world
        .service
        .subscribe(
            &world.customer(),
            SubscribeRequest {
                plan_id: plan.id,
                address_id: AddressId::new(),
                meal_preferences: lunch_only(),
                start_date: day(0),
                payment: PaymentConfirmation {
                    order_id: "order_1".to_string(),
                    payment_id: "pay_1".to_string(),
                    signature: "00".repeat(32),
                },
            },
            local(day(-1), 9, 0),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::PaymentVerification(_))));
}

#[tokio::test]
async fn test_subscribe_start_must_be_in_the_future() {
    let world = World::new().await;
    let plan = world.plan(2, false).await;

    let result = world
        .service
        .subscribe(
            &world.customer(),
            SubscribeRequest {
                plan_id: plan.id,
                address_id: AddressId::new(),
                meal_preferences: lunch_only(),
                start_date: day(0),
                payment: signed_payment("order_1", "pay_1"),
            },
            local(day(0), 9, 0),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::Validation(_))));
}

#[tokio::test]
async fn test_checkout_opens_a_gateway_order() {
    let world = World::new().await;
    let plan = world.plan(2, false).await;

    let checkout = world
        .service
        .checkout(
            &world.customer(),
            CheckoutRequest {
                item: CheckoutItem::Plan(plan.id),
                meal_preferences: lunch_only(),
                start_date: day(0),
            },
            local(day(-1), 9, 0),
        )
        .await
        .unwrap();

    assert_eq!(checkout.price, 7 * MEAL_PRICE);
    assert_eq!(checkout.gateway_order.amount, 7 * MEAL_PRICE);
    let orders = world.gateway.orders();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].receipt.starts_with("chk_"));
    assert_eq!(
        orders[0].notes.get("plan_id").map(String::as_str),
        Some(plan.id.to_string().as_str())
    );
}

#[tokio::test]
async fn test_free_trial_then_convert() {
    let world = World::new().await;
    let trial_type = world.trial_type(3, 0).await;
    let trial = world.trial(&trial_type).await;
    assert_eq!(trial.status, SubscriptionStatus::Trial);
    assert_eq!(trial.renewal_date, day(3));

    let plan = world.plan(2, false).await;
    let view = world
        .service
        .convert_trial(
            &world.customer(),
            trial.id,
            ConvertRequest {
                plan_id: plan.id,
                meal_preferences: None,
                payment: signed_payment("order_2", "pay_2"),
            },
            local(day(1), 9, 0),
        )
        .await
        .unwrap();

    let sub = view.subscription;
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.plan_id, Some(plan.id));
    assert_eq!(sub.cycle_start, day(3));
    assert_eq!(sub.renewal_date, day(10));
    assert_eq!(sub.meal_preferences[0].note.as_deref(), Some("less spicy"));
    assert_eq!(view.orders.len(), 3 + 7);
}

#[tokio::test]
async fn test_paid_trial_requires_payment() {
    let world = World::new().await;
    let trial_type = world.trial_type(3, 15_000).await;

    let trial = world.trial(&trial_type).await;
    assert_eq!(trial.price, 15_000);
    assert_eq!(trial.payment_id.as_deref(), Some("pay_t"));
}

#[tokio::test]
async fn test_renewal_is_refused_before_it_is_due() {
    let world = World::new().await;
    let sub = world.active().await;

    let result = world
        .service
        .renew(
            sub.id,
            Some(RenewalPayment {
                payment_id: "pay_2".to_string(),
                amount: 7 * MEAL_PRICE,
            }),
            local(day(3), 9, 0),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::Validation(_))));
}

#[tokio::test]
async fn test_paid_renewal_advances_the_cycle_once() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = local(day(5), 9, 0);
    let payment = || RenewalPayment {
        payment_id: "pay_2".to_string(),
        amount: 7 * MEAL_PRICE,
    };

    let outcome = world.service.renew(sub.id, Some(payment()), now).await.unwrap();
    assert_eq!(outcome.subscription.cycle_start, day(7));
    assert_eq!(outcome.subscription.renewal_date, day(14));
    assert_eq!(outcome.orders_created, 7);
    assert_eq!(outcome.redemption.applied, 0);

    let again = world.service.renew(sub.id, Some(payment()), now).await;
    assert!(matches!(again, Err(LifecycleError::Validation(_))));
}

#[tokio::test]
async fn test_renewal_from_credit_leaves_a_remainder() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = local(day(5), 9, 0);
    world
        .service
        .ledger()
        .mint(
            world.customer,
            None,
            70_000,
            CreditSource::Cancellation,
            now + Duration::days(30),
        )
        .await
        .unwrap();

    let quote = world.service.quote_renewal(sub.id, now).await.unwrap();
    assert_eq!(quote.credit_applied, 7 * MEAL_PRICE);
    assert_eq!(quote.amount_due, 0);
    assert!(quote.gateway_order.is_none());

    let outcome = world.service.renew(sub.id, None, now).await.unwrap();
    assert_eq!(outcome.redemption.applied, 7 * MEAL_PRICE);
    assert_eq!(outcome.redemption.used.len(), 1);
    let remainder = outcome.redemption.remainder.expect("unspent credit");
    assert_eq!(remainder.amount, 70_000 - 7 * MEAL_PRICE);
    assert_eq!(remainder.expires_at, now + Duration::days(30));

    let credits = world.service.ledger().list(world.customer).await.unwrap();
    assert_eq!(
        credits
            .iter()
            .filter(|c| c.status == CreditStatus::Used)
            .count(),
        1
    );
    assert_eq!(
        world.service.ledger().balance(world.customer, now).await.unwrap(),
        70_000 - 7 * MEAL_PRICE
    );
}

#[tokio::test]
async fn test_renewal_short_of_credit_changes_nothing() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = local(day(5), 9, 0);

    let quote = world.service.quote_renewal(sub.id, now).await.unwrap();
    assert_eq!(quote.amount_due, 7 * MEAL_PRICE);
    let gateway_order = quote.gateway_order.expect("gateway order for the amount due");
    assert_eq!(gateway_order.amount, 7 * MEAL_PRICE);

    let result = world.service.renew(sub.id, None, now).await;
    assert!(matches!(result, Err(LifecycleError::Validation(_))));

    let view = world.service.get(&world.customer(), sub.id, local(day(0), 8, 0)).await.unwrap();
    assert_eq!(view.subscription.cycle_start, day(0));
    assert_eq!(view.orders.len(), 7);
}

#[tokio::test]
async fn test_expire_is_terminal() {
    let world = World::new().await;
    let sub = world.active().await;

    let expired = world.service.expire(sub.id).await.unwrap();
    assert_eq!(expired.status, SubscriptionStatus::Expired);
    assert_eq!(expired.expiry_date, Some(day(6)));

    let again = world.service.expire(sub.id).await;
    assert!(matches!(again, Err(LifecycleError::InvalidTransition { .. })));

    let renew = world.service.renew(sub.id, None, local(day(6), 9, 0)).await;
    assert!(matches!(renew, Err(LifecycleError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_renewal_with_partial_credit_returns_it() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = local(day(5), 9, 0);
    let expires_at = now + Duration::days(30);
    world
        .service
        .ledger()
        .mint(world.customer, None, 20_000, CreditSource::Skip, expires_at)
        .await
        .unwrap();

    let result = world.service.renew(sub.id, None, now).await;
    assert!(matches!(result, Err(LifecycleError::Validation(_))));

    let ledger = world.service.ledger();
    assert_eq!(ledger.balance(world.customer, now).await.unwrap(), 20_000);
    let available: Vec<_> = ledger
        .list(world.customer)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.status == CreditStatus::Available)
        .collect();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].expires_at, expires_at);
}

#[tokio::test]
async fn test_lost_renewal_race_gives_credit_back() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = local(day(5), 9, 0);
    world
        .service
        .ledger()
        .mint(
            world.customer,
            None,
            70_000,
            CreditSource::Cancellation,
            now + Duration::days(30),
        )
        .await
        .unwrap();
    world.subscriptions.reject_cycle_advances();

    let result = world.service.renew(sub.id, None, now).await;
    assert!(matches!(result, Err(LifecycleError::Conflict(_))));

    assert_eq!(
        world.service.ledger().balance(world.customer, now).await.unwrap(),
        70_000
    );
    assert_eq!(world.orders.count(sub.id.0, OrderStatus::Scheduled), 7);
}

#[tokio::test]
async fn test_renewal_after_bounded_pause() {
    let world = World::new().await;
    let sub = world.active().await;
    world
        .service
        .pause(
            &world.customer(),
            sub.id,
            Some(day(2)),
            local(day(0), 12, 30) - Duration::hours(30),
        )
        .await
        .unwrap();

    let outcome = world
        .service
        .renew(
            sub.id,
            Some(RenewalPayment {
                payment_id: "pay_2".to_string(),
                amount: 7 * MEAL_PRICE,
            }),
            local(day(5), 9, 0),
        )
        .await
        .unwrap();

    assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
    assert_eq!(outcome.subscription.cycle_start, day(7));
    assert_eq!(outcome.orders_created, 7);
}
