//! PostgreSQL order repository implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use tiffin_types::{OrderStatus, Slot};

use crate::error::DbResult;
use crate::models::OrderRow;
use crate::repo::{CreateOrder, OrderRepository};

/// PostgreSQL order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<OrderRow>> {
        let order = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, subscription_id, service_date, cycle_start, slot, status, price, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>> {
        let orders = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, subscription_id, service_date, cycle_start, slot, status, price, created_at
            FROM orders
            WHERE subscription_id = $1
            ORDER BY service_date,
                     CASE slot WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 ELSE 2 END
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn find_for_slot(
        &self,
        subscription_id: Uuid,
        service_date: NaiveDate,
        slot: Slot,
    ) -> DbResult<Option<OrderRow>> {
        let order = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, subscription_id, service_date, cycle_start, slot, status, price, created_at
            FROM orders
            WHERE subscription_id = $1 AND service_date = $2 AND slot = $3
            "#,
        )
        .bind(subscription_id)
        .bind(service_date)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn create_many(&self, orders: &[CreateOrder]) -> DbResult<u64> {
        if orders.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let subscription_ids: Vec<Uuid> = orders.iter().map(|o| o.subscription_id).collect();
        let dates: Vec<NaiveDate> = orders.iter().map(|o| o.service_date).collect();
        let cycles: Vec<NaiveDate> = orders.iter().map(|o| o.cycle_start).collect();
        let slots: Vec<&str> = orders.iter().map(|o| o.slot.as_str()).collect();
        let prices: Vec<i64> = orders.iter().map(|o| o.price).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, subscription_id, service_date, cycle_start, slot, status, price)
            SELECT id, subscription_id, service_date, cycle_start, slot, 'scheduled', price
            FROM UNNEST($1::uuid[], $2::uuid[], $3::date[], $4::date[], $5::text[], $6::bigint[])
                 AS t(id, subscription_id, service_date, cycle_start, slot, price)
            ON CONFLICT (subscription_id, service_date, slot) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&subscription_ids)
        .bind(&dates)
        .bind(&cycles)
        .bind(&slots)
        .bind(&prices)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn transition(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn transition_many(
        &self,
        ids: &[Uuid],
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = ANY($1) AND status = $2
            "#,
        )
        .bind(ids)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
