//! PostgreSQL-backed user store
//!
//! Email uniqueness is enforced by a unique index, so concurrent creates for
//! the same address resolve in the database rather than in application code.

use crate::{
    error::{IdentityError, Result},
    models::*,
    repository::UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    roles         TEXT[] NOT NULL DEFAULT ARRAY['USER'],
    provider      TEXT NOT NULL,
    is_blocked    BOOLEAN NOT NULL DEFAULT FALSE,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const COLUMNS: &str = "id, email, password_hash, roles, provider, is_blocked, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    roles: Vec<String>,
    provider: String,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserIdentity {
    type Error = IdentityError;

    fn try_from(row: UserRow) -> Result<Self> {
        let provider = row
            .provider
            .parse::<Provider>()
            .map_err(|e| IdentityError::InternalError(anyhow::anyhow!(e)))?;
        Ok(UserIdentity {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles,
            provider,
            is_blocked: row.is_blocked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed user store
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find(&self, key: &IdentityKey) -> Result<Option<UserIdentity>> {
        let row = match key {
            IdentityKey::Id(id) => {
                sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            IdentityKey::Email(email) => {
                sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
                    .bind(normalize_email(email))
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        row.map(UserIdentity::try_from).transpose()
    }

    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity> {
        debug!(provider = %identity.provider, "Inserting user");

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, roles, provider)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(normalize_email(&identity.email))
        .bind(identity.password_hash)
        .bind(identity.roles)
        .bind(identity.provider.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                IdentityError::EmailAlreadyInUse
            }
            other => IdentityError::DatabaseError(other),
        })?;

        row.try_into()
    }

    async fn update(&self, id: Uuid, patch: IdentityPatch) -> Result<UserIdentity> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                password_hash = COALESCE($2, password_hash),
                roles         = COALESCE($3, roles),
                provider      = COALESCE($4, provider),
                is_blocked    = COALESCE($5, is_blocked),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.password_hash)
        .bind(patch.roles)
        .bind(patch.provider.map(Provider::as_str))
        .bind(patch.is_blocked)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(IdentityError::UserNotFound)?;

        row.try_into()
    }
}
