//! Repository bundle the lifecycle layer works against

use std::sync::Arc;

use tiffin_db::{
    CreditRepository, OrderRepository, PlanRepository, Repositories, SettingsRepository,
    SkipUsageRepository, SubscriptionRepository, TrialTypeRepository,
};
use tiffin_types::PlatformSettings;

use crate::error::LifecycleError;

/// Trait-object handles to every repository the lifecycle rules touch
#[derive(Clone)]
pub struct Stores {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub credits: Arc<dyn CreditRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub trial_types: Arc<dyn TrialTypeRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub skip_usage: Arc<dyn SkipUsageRepository>,
}

impl From<Repositories> for Stores {
    fn from(repos: Repositories) -> Self {
        Self {
            subscriptions: Arc::new(repos.subscriptions),
            orders: Arc::new(repos.orders),
            credits: Arc::new(repos.credits),
            plans: Arc::new(repos.plans),
            trial_types: Arc::new(repos.trial_types),
            settings: Arc::new(repos.settings),
            skip_usage: Arc::new(repos.skip_usage),
        }
    }
}

impl Stores {
    /// Current platform settings, or the defaults if none were ever saved
    pub async fn platform_settings(&self) -> Result<PlatformSettings, LifecycleError> {
        match self.settings.get().await? {
            Some(row) => Ok(row.try_into()?),
            None => Ok(PlatformSettings::default()),
        }
    }
}
