//! Cycle order generation and delivery timing

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use tiffin_db::CreateOrder;
use tiffin_types::{MealPreference, Order, Plan, PlatformSettings, PricingMode, Slot, SlotConfig};

use crate::error::LifecycleError;

/// How a cycle's meals are priced
#[derive(Debug, Clone, Copy)]
pub enum CyclePricing<'a> {
    /// Priced by the plan's pricing mode
    Plan(&'a Plan),
    /// A flat total spread over every meal (trials)
    Flat(i64),
}

/// Orders for one cycle and what they cost together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSchedule {
    /// One order per day per slot
    pub orders: Vec<CreateOrder>,
    /// Sum of the order prices
    pub price: i64,
}

/// Build the orders for every day in `[start, end)` and every slot in `slots`.
pub fn build_cycle(
    subscription_id: Uuid,
    slots: &[Slot],
    start: NaiveDate,
    end: NaiveDate,
    pricing: CyclePricing<'_>,
) -> Result<CycleSchedule, LifecycleError> {
    let mut slots = slots.to_vec();
    slots.sort();
    slots.dedup();

    let mut orders = Vec::new();
    for date in start.iter_days().take_while(|d| *d < end) {
        for slot in &slots {
            orders.push(CreateOrder {
                id: Uuid::new_v4(),
                subscription_id,
                service_date: date,
                cycle_start: start,
                slot: *slot,
                price: 0,
            });
        }
    }

    if orders.is_empty() {
        return Err(LifecycleError::validation("cycle has no meals"));
    }

    match pricing {
        CyclePricing::Plan(plan) => match plan.pricing {
            PricingMode::PerMealDiscount { .. } => {
                for order in &mut orders {
                    order.price = plan.discounted_meal_price(order.slot).ok_or_else(|| {
                        LifecycleError::validation(format!(
                            "plan does not offer {}",
                            order.slot
                        ))
                    })?;
                }
            }
            PricingMode::Fixed { cycle_price } => spread(&mut orders, cycle_price),
        },
        CyclePricing::Flat(total) => spread(&mut orders, total),
    }

    let price = orders.iter().map(|o| o.price).sum();
    Ok(CycleSchedule { orders, price })
}

/// Split `total` evenly, the rounding remainder going to the first meal.
fn spread(orders: &mut [CreateOrder], total: i64) {
    let count = orders.len() as i64;
    let share = total / count;
    let remainder = total % count;
    for (i, order) in orders.iter_mut().enumerate() {
        order.price = if i == 0 { share + remainder } else { share };
    }
}

/// Check a customer's slot selection against what is on offer
pub fn validate_preferences(
    preferences: &[MealPreference],
    configs: &[SlotConfig],
) -> Result<(), LifecycleError> {
    if preferences.is_empty() {
        return Err(LifecycleError::validation("choose at least one meal slot"));
    }
    for (i, pref) in preferences.iter().enumerate() {
        if preferences[..i].iter().any(|p| p.slot == pref.slot) {
            return Err(LifecycleError::validation(format!(
                "{} chosen twice",
                pref.slot
            )));
        }
        if !configs.iter().any(|c| c.slot == pref.slot) {
            return Err(LifecycleError::validation(format!(
                "{} is not offered",
                pref.slot
            )));
        }
        if pref.note.as_ref().is_some_and(|n| n.len() > 500) {
            return Err(LifecycleError::validation("meal note too long (max 500 chars)"));
        }
    }
    Ok(())
}

/// Local start of a slot's delivery window
pub fn window_start(configs: &[SlotConfig], slot: Slot) -> NaiveTime {
    configs
        .iter()
        .find(|c| c.slot == slot)
        .map(|c| c.delivery_window_start)
        .unwrap_or_else(|| slot.default_window_start())
}

/// UTC instant an order is due for delivery
pub fn delivery_instant(
    settings: &PlatformSettings,
    configs: &[SlotConfig],
    order: &Order,
) -> DateTime<Utc> {
    settings.delivery_instant(order.service_date, window_start(configs, order.slot))
}
