//! PostgreSQL platform settings and skip usage repositories

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use tiffin_types::{PlatformSettings, Slot};

use crate::error::{DbError, DbResult};
use crate::models::PlatformSettingsRow;
use crate::repo::{SettingsRepository, SkipUsageRepository};

/// PostgreSQL platform settings repository
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    /// Create a new settings repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn as_int(column: &'static str, value: u32) -> DbResult<i32> {
    i32::try_from(value).map_err(|e| DbError::decode(column, e))
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get(&self) -> DbResult<Option<PlatformSettingsRow>> {
        let row = sqlx::query_as::<_, PlatformSettingsRow>(
            r#"
            SELECT pause_notice_hours, resume_notice_hours, cancel_notice_hours, max_pause_days,
                   credit_expiry_days, refund_policy, utc_offset_minutes
            FROM platform_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save(&self, settings: &PlatformSettings) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO platform_settings (id, pause_notice_hours, resume_notice_hours,
                                           cancel_notice_hours, max_pause_days,
                                           credit_expiry_days, refund_policy, utc_offset_minutes)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET pause_notice_hours = EXCLUDED.pause_notice_hours,
                resume_notice_hours = EXCLUDED.resume_notice_hours,
                cancel_notice_hours = EXCLUDED.cancel_notice_hours,
                max_pause_days = EXCLUDED.max_pause_days,
                credit_expiry_days = EXCLUDED.credit_expiry_days,
                refund_policy = EXCLUDED.refund_policy,
                utc_offset_minutes = EXCLUDED.utc_offset_minutes,
                updated_at = NOW()
            "#,
        )
        .bind(as_int("pause_notice_hours", settings.pause_notice_hours)?)
        .bind(as_int("resume_notice_hours", settings.resume_notice_hours)?)
        .bind(as_int("cancel_notice_hours", settings.cancel_notice_hours)?)
        .bind(as_int("max_pause_days", settings.max_pause_days)?)
        .bind(as_int("credit_expiry_days", settings.credit_expiry_days)?)
        .bind(settings.refund_policy.as_str())
        .bind(settings.utc_offset_minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL skip usage repository
#[derive(Clone)]
pub struct PgSkipUsageRepository {
    pool: PgPool,
}

impl PgSkipUsageRepository {
    /// Create a new skip usage repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkipUsageRepository for PgSkipUsageRepository {
    async fn used(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
    ) -> DbResult<i32> {
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT used FROM skip_usage
            WHERE subscription_id = $1 AND cycle_start = $2 AND slot = $3
            "#,
        )
        .bind(subscription_id)
        .bind(cycle_start)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(used.unwrap_or(0))
    }

    async fn try_increment(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
        limit: i32,
    ) -> DbResult<Option<i32>> {
        // The row lock taken by ON CONFLICT serialises concurrent skips, so the
        // `used < limit` guard holds under contention.
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO skip_usage (subscription_id, cycle_start, slot, used)
            SELECT $1, $2, $3, 1 WHERE $4 > 0
            ON CONFLICT (subscription_id, cycle_start, slot)
            DO UPDATE SET used = skip_usage.used + 1
            WHERE skip_usage.used < $4
            RETURNING used
            "#,
        )
        .bind(subscription_id)
        .bind(cycle_start)
        .bind(slot.as_str())
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(used)
    }

    async fn release(
        &self,
        subscription_id: Uuid,
        cycle_start: NaiveDate,
        slot: Slot,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE skip_usage SET used = used - 1
            WHERE subscription_id = $1 AND cycle_start = $2 AND slot = $3 AND used > 0
            "#,
        )
        .bind(subscription_id)
        .bind(cycle_start)
        .bind(slot.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
