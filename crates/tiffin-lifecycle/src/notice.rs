//! Advance-notice windows and the auto-cancel guard

use chrono::{DateTime, Duration, NaiveDate, Utc};

use tiffin_types::{PlatformSettings, Subscription, SubscriptionStatus};

use crate::error::LifecycleError;

/// Require `now + hours <= effective`.
///
/// `effective` is the delivery instant the action first affects.
pub fn ensure_lead_time(
    now: DateTime<Utc>,
    effective: DateTime<Utc>,
    hours: u32,
) -> Result<(), LifecycleError> {
    let deadline = effective - Duration::hours(i64::from(hours));
    if now > deadline {
        return Err(LifecycleError::NoticeViolation {
            required_hours: hours,
            deadline,
        });
    }
    Ok(())
}

/// Whether a subscription has been paused longer than the platform allows.
///
/// Pure policy check; the forced cancellation itself is driven by an
/// external scheduled job.
pub fn auto_cancel_eligible(
    subscription: &Subscription,
    settings: &PlatformSettings,
    today: NaiveDate,
) -> bool {
    if subscription.status != SubscriptionStatus::Paused || pause_has_ended(subscription, today) {
        return false;
    }
    match subscription.paused_from {
        Some(from) => (today - from).num_days() > i64::from(settings.max_pause_days),
        None => false,
    }
}

/// Whether a bounded pause is behind us: its last paused day is before `today`
pub fn pause_has_ended(subscription: &Subscription, today: NaiveDate) -> bool {
    subscription.status == SubscriptionStatus::Paused
        && subscription.paused_until.is_some_and(|until| until < today)
}

/// Latest `paused_from` that is still within the pause limit on `today`
pub fn pause_cutoff(settings: &PlatformSettings, today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(settings.max_pause_days))
}
