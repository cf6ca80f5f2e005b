//! PostgreSQL-backed refresh session store
//!
//! The `(user_id, device_fingerprint)` unique constraint plus
//! `INSERT .. ON CONFLICT DO UPDATE` gives one atomic upsert per pair, and
//! `DELETE .. RETURNING` makes redemption consume-once without a
//! separate read. Rows are keyed by the token's SHA-256 digest.

use super::{generate_token, hash_refresh_token, RefreshSessionStore, SessionTtl, StoreResult};
use crate::models::{RefreshSession, SessionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS refresh_sessions (
    token_hash         TEXT PRIMARY KEY,
    user_id            UUID NOT NULL,
    device_fingerprint TEXT NOT NULL,
    expires_at         TIMESTAMPTZ NOT NULL,
    UNIQUE (user_id, device_fingerprint)
)
"#;

const EXPIRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS refresh_sessions_expires_at_idx ON refresh_sessions (expires_at)";

#[derive(Debug, FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: Uuid,
    device_fingerprint: String,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            token_hash: row.token_hash,
            user_id: row.user_id,
            device_fingerprint: row.device_fingerprint,
            expires_at: row.expires_at,
        }
    }
}

pub struct PostgresRefreshSessionStore {
    pool: PgPool,
    ttl: SessionTtl,
}

impl PostgresRefreshSessionStore {
    pub fn new(pool: PgPool, ttl: SessionTtl) -> Self {
        Self { pool, ttl }
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query(EXPIRY_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshSessionStore for PostgresRefreshSessionStore {
    async fn issue_for(&self, user_id: Uuid, device_fingerprint: &str) -> StoreResult<RefreshSession> {
        let token = generate_token();
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO refresh_sessions (token_hash, user_id, device_fingerprint, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, device_fingerprint)
            DO UPDATE SET token_hash = EXCLUDED.token_hash, expires_at = EXCLUDED.expires_at
            RETURNING token_hash, user_id, device_fingerprint, expires_at
            "#,
        )
        .bind(hash_refresh_token(&token))
        .bind(user_id)
        .bind(device_fingerprint)
        .bind(self.ttl.expiry_from(Utc::now())?)
        .fetch_one(&self.pool)
        .await?;

        Ok(RefreshSession::from_record(row.into(), token))
    }

    async fn redeem(&self, token: &str) -> StoreResult<Option<RefreshSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            DELETE FROM refresh_sessions
            WHERE token_hash = $1
            RETURNING token_hash, user_id, device_fingerprint, expires_at
            "#,
        )
        .bind(hash_refresh_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| RefreshSession::from_record(row.into(), token)))
    }

    async fn revoke(&self, token: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE token_hash = $1")
            .bind(hash_refresh_token(token))
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Refresh session revoked");
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<SessionRecord>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT token_hash, user_id, device_fingerprint, expires_at
            FROM refresh_sessions
            WHERE user_id = $1
            ORDER BY expires_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
