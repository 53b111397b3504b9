//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;
use crate::repo::{
    AdvanceCycle, CancelSubscription, ConvertTrial, CreateSubscription, SubscriptionRepository,
};

const COLUMNS: &str = r#"
    id, consumer_id, vendor_id, plan_id, trial_type_id, address_id, status,
    start_date, cycle_start, renewal_date, expiry_date, price, meal_preferences,
    paused_from, paused_until, cancelled_at, cancellation_reason, payment_id,
    created_at, updated_at
"#;

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE consumer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(consumer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn find_paused_before(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM subscriptions
            WHERE status = 'paused' AND paused_from < $1
              AND (paused_until IS NULL OR paused_until >= $2)
            ORDER BY paused_from
            "#
        ))
        .bind(date)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn find_pauses_ended_before(&self, today: NaiveDate) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM subscriptions
            WHERE status = 'paused' AND paused_until < $1
            ORDER BY paused_until
            "#
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions (id, consumer_id, vendor_id, plan_id, trial_type_id,
                                       address_id, status, start_date, cycle_start, renewal_date,
                                       price, meal_preferences, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(sub.id)
        .bind(sub.consumer_id)
        .bind(sub.vendor_id)
        .bind(sub.plan_id)
        .bind(sub.trial_type_id)
        .bind(sub.address_id)
        .bind(sub.status.as_str())
        .bind(sub.start_date)
        .bind(sub.renewal_date)
        .bind(sub.price)
        .bind(Json(&sub.meal_preferences))
        .bind(&sub.payment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_paused(
        &self,
        id: Uuid,
        paused_from: NaiveDate,
        paused_until: Option<NaiveDate>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'paused', paused_from = $2, paused_until = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(paused_from)
        .bind(paused_until)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_resumed(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'active', paused_from = NULL, paused_until = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'paused'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_cancelled(&self, cancel: CancelSubscription) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', cancelled_at = $3, cancellation_reason = $4,
                expiry_date = $5, paused_from = NULL, paused_until = NULL, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(cancel.id)
        .bind(cancel.from.as_str())
        .bind(cancel.cancelled_at)
        .bind(&cancel.reason)
        .bind(cancel.expiry_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_expired(&self, id: Uuid, expiry_date: NaiveDate) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', expiry_date = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(expiry_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn advance_cycle(&self, advance: AdvanceCycle) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET cycle_start = $3, renewal_date = $4, price = $5, payment_id = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND cycle_start = $2
            "#,
        )
        .bind(advance.id)
        .bind(advance.expected_cycle_start)
        .bind(advance.cycle_start)
        .bind(advance.renewal_date)
        .bind(advance.price)
        .bind(&advance.payment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn convert_trial(&self, convert: ConvertTrial) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'active', plan_id = $2, cycle_start = $3, renewal_date = $4,
                price = $5, meal_preferences = $6, payment_id = $7, updated_at = NOW()
            WHERE id = $1 AND status = 'trial'
            "#,
        )
        .bind(convert.id)
        .bind(convert.plan_id)
        .bind(convert.cycle_start)
        .bind(convert.renewal_date)
        .bind(convert.price)
        .bind(Json(&convert.meal_preferences))
        .bind(&convert.payment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
