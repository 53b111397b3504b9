//! PostgreSQL credit repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::CreditRow;
use crate::repo::{CreateCredit, CreditRepository};

/// PostgreSQL credit repository
#[derive(Clone)]
pub struct PgCreditRepository {
    pool: PgPool,
}

impl PgCreditRepository {
    /// Create a new credit repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditRepository for PgCreditRepository {
    async fn find_by_consumer(&self, consumer_id: Uuid) -> DbResult<Vec<CreditRow>> {
        let credits = sqlx::query_as::<_, CreditRow>(
            r#"
            SELECT id, consumer_id, subscription_id, amount, source, status, expires_at, created_at
            FROM credits
            WHERE consumer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(consumer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }

    async fn find_redeemable(
        &self,
        consumer_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<CreditRow>> {
        let credits = sqlx::query_as::<_, CreditRow>(
            r#"
            SELECT id, consumer_id, subscription_id, amount, source, status, expires_at, created_at
            FROM credits
            WHERE consumer_id = $1 AND status = 'available' AND expires_at > $2
            ORDER BY expires_at, created_at
            "#,
        )
        .bind(consumer_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }

    async fn create(&self, credit: CreateCredit) -> DbResult<CreditRow> {
        let row = sqlx::query_as::<_, CreditRow>(
            r#"
            INSERT INTO credits (id, consumer_id, subscription_id, amount, source, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, consumer_id, subscription_id, amount, source, status, expires_at,
                      created_at
            "#,
        )
        .bind(credit.id)
        .bind(credit.consumer_id)
        .bind(credit.subscription_id)
        .bind(credit.amount)
        .bind(credit.source.as_str())
        .bind(credit.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_used(&self, id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE credits SET status = 'used' WHERE id = $1 AND status = 'available'")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_available(&self, id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE credits SET status = 'available' WHERE id = $1 AND status = 'used'")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE credits SET status = 'expired' WHERE status = 'available' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
