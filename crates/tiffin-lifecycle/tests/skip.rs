//! Per-slot skip limits, cutoffs and skip credit

mod common;

use chrono::Duration;
use common::{day, local, lunch, World, MEAL_PRICE};
use tiffin_lifecycle::{LifecycleError, RenewalPayment};
use tiffin_types::{CreditSource, OrderStatus, Slot, SubscriptionStatus};

#[tokio::test]
async fn test_third_skip_over_limit_two_is_rejected() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = lunch(day(0)) - Duration::hours(30);

    let first = world
        .service
        .apply_skip(&world.customer(), sub.id, day(1), Slot::Lunch, now)
        .await
        .unwrap();
    assert_eq!((first.used, first.remaining), (1, 1));

    let second = world
        .service
        .apply_skip(&world.customer(), sub.id, day(2), Slot::Lunch, now)
        .await
        .unwrap();
    assert_eq!((second.used, second.remaining), (2, 0));

    let third = world
        .service
        .apply_skip(&world.customer(), sub.id, day(3), Slot::Lunch, now)
        .await;
    match third {
        Err(LifecycleError::LimitExceeded { slot, limit }) => {
            assert_eq!(slot, Slot::Lunch);
            assert_eq!(limit, 2);
        }
        other => panic!("Expected LimitExceeded, got: {:?}", other),
    }
    assert_eq!(world.orders.count(sub.id.0, OrderStatus::SkippedByCustomer), 2);
}

#[tokio::test]
async fn test_skip_after_cutoff_is_rejected() {
    let world = World::new().await;
    let sub = world.active().await;

    let result = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(2),
            Slot::Lunch,
            lunch(day(2)) - Duration::hours(11),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::NoticeViolation { .. })));

    // The rejected attempt did not use up the allowance
    let now = lunch(day(2)) - Duration::hours(13);
    for date in [day(2), day(3)] {
        world
            .service
            .apply_skip(&world.customer(), sub.id, date, Slot::Lunch, now)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_skipping_the_same_meal_twice_is_invalid_transition() {
    let world = World::new().await;
    let plan = world.plan(3, false).await;
    let sub = world.subscribe(&plan).await;
    let now = lunch(day(0)) - Duration::hours(30);

    world
        .service
        .apply_skip(&world.customer(), sub.id, day(4), Slot::Lunch, now)
        .await
        .unwrap();
    let again = world
        .service
        .apply_skip(&world.customer(), sub.id, day(4), Slot::Lunch, now)
        .await;

    assert!(matches!(again, Err(LifecycleError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_skip_credit_when_plan_grants_it() {
    let world = World::new().await;
    let plan = world.plan(2, true).await;
    let sub = world.subscribe(&plan).await;

    let outcome = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(1),
            Slot::Lunch,
            lunch(day(0)) - Duration::hours(30),
        )
        .await
        .unwrap();

    let credit = outcome.credit.expect("plan grants skip credit");
    assert_eq!(credit.amount, MEAL_PRICE);
    assert_eq!(credit.source, CreditSource::Skip);
    assert_eq!(credit.subscription_id, Some(sub.id));
}

#[tokio::test]
async fn test_skip_without_credit_mints_nothing() {
    let world = World::new().await;
    let sub = world.active().await;

    let outcome = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(1),
            Slot::Lunch,
            lunch(day(0)) - Duration::hours(30),
        )
        .await
        .unwrap();

    assert!(outcome.credit.is_none());
    assert!(world.credits.all().is_empty());
}

#[tokio::test]
async fn test_skip_unknown_slot_is_validation_error() {
    let world = World::new().await;
    let sub = world.active().await;

    let result = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(1),
            Slot::Dinner,
            lunch(day(0)) - Duration::hours(30),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::Validation(_))));
}

#[tokio::test]
async fn test_skip_on_a_day_without_a_meal_is_not_found() {
    let world = World::new().await;
    let sub = world.active().await;

    let result = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(9),
            Slot::Lunch,
            lunch(day(0)) - Duration::hours(30),
        )
        .await;

    assert!(matches!(result, Err(LifecycleError::NotFound("order"))));
}

#[tokio::test]
async fn test_trials_allow_no_skips() {
    let world = World::new().await;
    let trial = world.trial_type(3, 0).await;
    let sub = world.trial(&trial).await;

    let result = world
        .service
        .apply_skip(
            &world.customer(),
            sub.id,
            day(1),
            Slot::Lunch,
            lunch(day(0)) - Duration::hours(30),
        )
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::LimitExceeded { limit: 0, .. })
    ));
}

#[tokio::test]
async fn test_skip_while_paused_is_invalid_transition() {
    let world = World::new().await;
    let sub = world.active().await;
    let now = lunch(day(0)) - Duration::hours(30);
    world
        .service
        .pause(&world.customer(), sub.id, None, now)
        .await
        .unwrap();

    let result = world
        .service
        .apply_skip(&world.customer(), sub.id, day(1), Slot::Lunch, now)
        .await;

    match result {
        Err(LifecycleError::InvalidTransition { from, .. }) => assert_eq!(from, "paused"),
        other => panic!("Expected InvalidTransition, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_skip_is_allowed_once_a_bounded_pause_is_over() {
    let world = World::new().await;
    let sub = world.active().await;
    world
        .service
        .pause(
            &world.customer(),
            sub.id,
            Some(day(2)),
            lunch(day(0)) - Duration::hours(30),
        )
        .await
        .unwrap();

    let outcome = world
        .service
        .apply_skip(&world.customer(), sub.id, day(5), Slot::Lunch, local(day(4), 8, 0))
        .await
        .unwrap();

    assert_eq!(outcome.order.status, OrderStatus::SkippedByCustomer);
    assert_eq!(outcome.used, 1);
    let view = world
        .service
        .get(&world.customer(), sub.id, local(day(4), 8, 0))
        .await
        .unwrap();
    assert_eq!(view.subscription.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn test_paid_meals_stay_skippable_after_early_renewal() {
    let world = World::new().await;
    let plan = world.plan(1, false).await;
    let sub = world.subscribe(&plan).await;
    let now = local(day(5), 8, 0);

    world
        .service
        .renew(
            sub.id,
            Some(RenewalPayment {
                payment_id: "pay_2".to_string(),
                amount: 7 * MEAL_PRICE,
            }),
            now,
        )
        .await
        .unwrap();

    // Day 6 belongs to the cycle that was running when renewal happened
    let old_cycle = world
        .service
        .apply_skip(&world.customer(), sub.id, day(6), Slot::Lunch, now)
        .await
        .unwrap();
    assert_eq!(old_cycle.order.cycle_start, day(0));
    assert_eq!((old_cycle.used, old_cycle.remaining), (1, 0));

    // The new cycle has its own allowance
    let new_cycle = world
        .service
        .apply_skip(&world.customer(), sub.id, day(8), Slot::Lunch, now)
        .await
        .unwrap();
    assert_eq!(new_cycle.order.cycle_start, day(7));
    assert_eq!(new_cycle.used, 1);

    let over = world
        .service
        .apply_skip(&world.customer(), sub.id, day(9), Slot::Lunch, now)
        .await;
    assert!(matches!(over, Err(LifecycleError::LimitExceeded { limit: 1, .. })));
}
