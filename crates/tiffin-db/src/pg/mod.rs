//! PostgreSQL repository implementations

mod credit;
mod order;
mod plan;
mod session;
mod settings;
mod subscription;

pub use credit::PgCreditRepository;
pub use order::PgOrderRepository;
pub use plan::{PgPlanRepository, PgTrialTypeRepository};
pub use session::PgSessionRepository;
pub use settings::{PgSettingsRepository, PgSkipUsageRepository};
pub use subscription::PgSubscriptionRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: PgSubscriptionRepository,
    pub orders: PgOrderRepository,
    pub credits: PgCreditRepository,
    pub plans: PgPlanRepository,
    pub trial_types: PgTrialTypeRepository,
    pub settings: PgSettingsRepository,
    pub skip_usage: PgSkipUsageRepository,
    pub sessions: PgSessionRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: PgSubscriptionRepository::new(pool.clone()),
            orders: PgOrderRepository::new(pool.clone()),
            credits: PgCreditRepository::new(pool.clone()),
            plans: PgPlanRepository::new(pool.clone()),
            trial_types: PgTrialTypeRepository::new(pool.clone()),
            settings: PgSettingsRepository::new(pool.clone()),
            skip_usage: PgSkipUsageRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool),
        }
    }
}
