//! Plans, trial types and platform settings administration

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use tiffin_types::{
    Actor, Plan, PlanId, PlanPeriod, PlatformSettings, PricingMode, Role, SlotConfig, TrialType,
    TrialTypeId, UserId,
};

use crate::error::{LifecycleError, LifecycleResult};
use crate::stores::Stores;

/// New plan
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
    /// Owning vendor; admins must set it, vendors may omit it
    pub vendor_id: Option<UserId>,
    /// Display name
    pub name: String,
    /// Cycle length
    pub period: PlanPeriod,
    /// Slots on offer with their prices and skip rules
    pub slots: Vec<SlotConfig>,
    /// How a cycle is priced
    pub pricing: PricingMode,
    /// Whether customer skips earn credit
    #[serde(default)]
    pub grants_skip_credit: bool,
}

/// Replacement for a plan's editable fields
#[derive(Debug, Clone, Deserialize)]
pub struct PlanUpdate {
    /// Display name
    pub name: String,
    /// Cycle length; applies from the next renewal
    pub period: PlanPeriod,
    /// Slots on offer with their prices and skip rules
    pub slots: Vec<SlotConfig>,
    /// How a cycle is priced
    pub pricing: PricingMode,
    /// Whether customer skips earn credit
    pub grants_skip_credit: bool,
    /// Whether the plan accepts new subscribers
    pub active: bool,
}

/// New trial type
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrialType {
    /// Vendor offering it; `None` for a platform-wide trial
    pub vendor_id: Option<UserId>,
    /// Display name
    pub name: String,
    /// Length of the trial in days
    pub duration_days: u32,
    /// Total price; zero for a free trial
    pub price: i64,
    /// Slots a trial customer may choose
    pub slots: Vec<SlotConfig>,
}

/// Replacement for a trial type's editable fields
#[derive(Debug, Clone, Deserialize)]
pub struct TrialTypeUpdate {
    /// Display name
    pub name: String,
    /// Length of the trial in days
    pub duration_days: u32,
    /// Total price; zero for a free trial
    pub price: i64,
    /// Slots a trial customer may choose
    pub slots: Vec<SlotConfig>,
    /// Whether new trials may start
    pub active: bool,
}

/// Catalog administration
#[derive(Clone)]
pub struct Catalog {
    stores: Stores,
}

impl Catalog {
    /// Create a new catalog
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Create a plan. Vendors create their own; admins create for any vendor.
    #[instrument(skip(self, actor, plan), fields(user_id = %actor.user_id))]
    pub async fn create_plan(
        &self,
        actor: &Actor,
        plan: NewPlan,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Plan> {
        let vendor_id = match (actor.role, plan.vendor_id) {
            (Role::Admin, Some(vendor)) => vendor,
            (Role::Admin, None) => {
                return Err(LifecycleError::validation("vendor_id is required"));
            }
            (Role::Vendor, None) => actor.user_id,
            (Role::Vendor, Some(vendor)) if vendor == actor.user_id => vendor,
            _ => return Err(LifecycleError::Unauthorized("plan")),
        };

        let plan = Plan {
            id: PlanId::new(),
            vendor_id,
            name: plan.name.trim().to_string(),
            period: plan.period,
            slots: plan.slots,
            pricing: plan.pricing,
            grants_skip_credit: plan.grants_skip_credit,
            active: true,
            created_at: now,
        };
        plan.validate()?;

        let plan: Plan = self.stores.plans.create(&plan).await?.try_into()?;
        info!(plan_id = %plan.id, vendor_id = %plan.vendor_id, "Plan created");
        Ok(plan)
    }

    /// Overwrite a plan's editable fields (admin only)
    #[instrument(skip(self, actor, update), fields(user_id = %actor.user_id))]
    pub async fn update_plan(
        &self,
        actor: &Actor,
        id: PlanId,
        update: PlanUpdate,
    ) -> LifecycleResult<Plan> {
        require_admin(actor)?;
        let current = self.plan(id).await?;

        let plan = Plan {
            name: update.name.trim().to_string(),
            period: update.period,
            slots: update.slots,
            pricing: update.pricing,
            grants_skip_credit: update.grants_skip_credit,
            active: update.active,
            ..current
        };
        plan.validate()?;

        if !self.stores.plans.update(&plan).await? {
            return Err(LifecycleError::NotFound("plan"));
        }
        info!(plan_id = %id, "Plan updated");
        Ok(plan)
    }

    /// Stop a plan accepting subscribers. Existing subscriptions continue.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn deactivate_plan(&self, actor: &Actor, id: PlanId) -> LifecycleResult<Plan> {
        let plan = self.plan(id).await?;
        match actor.role {
            Role::Admin => {}
            Role::Vendor if actor.user_id == plan.vendor_id => {}
            _ => return Err(LifecycleError::Unauthorized("plan")),
        }

        if !self.stores.plans.set_active(id.0, false).await? {
            return Err(LifecycleError::NotFound("plan"));
        }
        info!(plan_id = %id, "Plan deactivated");
        Ok(Plan {
            active: false,
            ..plan
        })
    }

    /// Create a trial type (admin only)
    #[instrument(skip(self, actor, trial), fields(user_id = %actor.user_id))]
    pub async fn create_trial_type(
        &self,
        actor: &Actor,
        trial: NewTrialType,
        now: DateTime<Utc>,
    ) -> LifecycleResult<TrialType> {
        require_admin(actor)?;

        let trial = TrialType {
            id: TrialTypeId::new(),
            vendor_id: trial.vendor_id,
            name: trial.name.trim().to_string(),
            duration_days: trial.duration_days,
            price: trial.price,
            slots: trial.slots,
            active: true,
            created_at: now,
        };
        trial.validate()?;

        let trial: TrialType = self.stores.trial_types.create(&trial).await?.try_into()?;
        info!(trial_type_id = %trial.id, "Trial type created");
        Ok(trial)
    }

    /// Overwrite a trial type's editable fields (admin only)
    #[instrument(skip(self, actor, update), fields(user_id = %actor.user_id))]
    pub async fn update_trial_type(
        &self,
        actor: &Actor,
        id: TrialTypeId,
        update: TrialTypeUpdate,
    ) -> LifecycleResult<TrialType> {
        require_admin(actor)?;
        let current: TrialType = self
            .stores
            .trial_types
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::NotFound("trial type"))?
            .try_into()?;

        let trial = TrialType {
            name: update.name.trim().to_string(),
            duration_days: update.duration_days,
            price: update.price,
            slots: update.slots,
            active: update.active,
            ..current
        };
        trial.validate()?;

        if !self.stores.trial_types.update(&trial).await? {
            return Err(LifecycleError::NotFound("trial type"));
        }
        info!(trial_type_id = %id, "Trial type updated");
        Ok(trial)
    }

    /// Read platform settings (admin only)
    pub async fn settings(&self, actor: &Actor) -> LifecycleResult<PlatformSettings> {
        require_admin(actor)?;
        self.stores.platform_settings().await
    }

    /// Replace platform settings (admin only)
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn update_settings(
        &self,
        actor: &Actor,
        settings: PlatformSettings,
    ) -> LifecycleResult<PlatformSettings> {
        require_admin(actor)?;
        settings.validate()?;
        self.stores.settings.save(&settings).await?;
        info!(refund_policy = %settings.refund_policy, "Platform settings updated");
        Ok(settings)
    }

    async fn plan(&self, id: PlanId) -> LifecycleResult<Plan> {
        Ok(self
            .stores
            .plans
            .find_by_id(id.0)
            .await?
            .ok_or(LifecycleError::NotFound("plan"))?
            .try_into()?)
    }
}

fn require_admin(actor: &Actor) -> LifecycleResult<()> {
    if !actor.is_admin() {
        return Err(LifecycleError::Unauthorized("catalog"));
    }
    Ok(())
}
