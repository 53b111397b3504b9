//! PostgreSQL session repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SessionRow;
use crate::repo::{CreateSession, SessionRepository};

/// PostgreSQL session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_token_hash(&self, token_hash: &str) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, role, token_hash, created_at, expires_at, revoked
            FROM sessions
            WHERE token_hash = $1 AND NOT revoked AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn create(&self, session: CreateSession) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, user_id, role, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, role, token_hash, created_at, expires_at, revoked
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.role.as_str())
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn revoke(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
