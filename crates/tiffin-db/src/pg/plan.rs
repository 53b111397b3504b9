//! PostgreSQL plan and trial type repository implementations

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use tiffin_types::{Plan, TrialType};

use crate::error::{DbError, DbResult};
use crate::models::{PlanRow, TrialTypeRow};
use crate::repo::{PlanRepository, TrialTypeRepository};

/// PostgreSQL plan repository
#[derive(Clone)]
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    /// Create a new plan repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<PlanRow>> {
        let plan = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, vendor_id, name, period, slots, pricing, grants_skip_credit, active,
                   created_at
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn create(&self, plan: &Plan) -> DbResult<PlanRow> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            INSERT INTO plans (id, vendor_id, name, period, slots, pricing, grants_skip_credit,
                               active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, vendor_id, name, period, slots, pricing, grants_skip_credit, active,
                      created_at
            "#,
        )
        .bind(plan.id.0)
        .bind(plan.vendor_id.0)
        .bind(&plan.name)
        .bind(plan.period.as_str())
        .bind(Json(&plan.slots))
        .bind(Json(&plan.pricing))
        .bind(plan.grants_skip_credit)
        .bind(plan.active)
        .bind(plan.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, plan: &Plan) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE plans
            SET name = $2, period = $3, slots = $4, pricing = $5, grants_skip_credit = $6,
                active = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(plan.id.0)
        .bind(&plan.name)
        .bind(plan.period.as_str())
        .bind(Json(&plan.slots))
        .bind(Json(&plan.pricing))
        .bind(plan.grants_skip_credit)
        .bind(plan.active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE plans SET active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// PostgreSQL trial type repository
#[derive(Clone)]
pub struct PgTrialTypeRepository {
    pool: PgPool,
}

impl PgTrialTypeRepository {
    /// Create a new trial type repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn duration_days(trial: &TrialType) -> DbResult<i32> {
    i32::try_from(trial.duration_days).map_err(|e| DbError::decode("duration_days", e))
}

#[async_trait]
impl TrialTypeRepository for PgTrialTypeRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<TrialTypeRow>> {
        let trial = sqlx::query_as::<_, TrialTypeRow>(
            r#"
            SELECT id, vendor_id, name, duration_days, price, slots, active, created_at
            FROM trial_types
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(trial)
    }

    async fn create(&self, trial: &TrialType) -> DbResult<TrialTypeRow> {
        let row = sqlx::query_as::<_, TrialTypeRow>(
            r#"
            INSERT INTO trial_types (id, vendor_id, name, duration_days, price, slots, active,
                                     created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, vendor_id, name, duration_days, price, slots, active, created_at
            "#,
        )
        .bind(trial.id.0)
        .bind(trial.vendor_id.map(|v| v.0))
        .bind(&trial.name)
        .bind(duration_days(trial)?)
        .bind(trial.price)
        .bind(Json(&trial.slots))
        .bind(trial.active)
        .bind(trial.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, trial: &TrialType) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE trial_types
            SET name = $2, duration_days = $3, price = $4, slots = $5, active = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(trial.id.0)
        .bind(&trial.name)
        .bind(duration_days(trial)?)
        .bind(trial.price)
        .bind(Json(&trial.slots))
        .bind(trial.active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
