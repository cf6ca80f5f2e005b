use crate::store::hash_refresh_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One rotating refresh token bound to a `(user_id, device_fingerprint)` pair.
///
/// Carries the raw token, so it only exists in the hands of the caller that
/// was issued or presented it. Stores keep a [`SessionRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSession {
    pub token: String,
    pub user_id: Uuid,
    /// Opaque client identifier (typically the user agent). Scopes the
    /// session; it is not a security boundary.
    pub device_fingerprint: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Stored form of this session.
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            token_hash: hash_refresh_token(&self.token),
            user_id: self.user_id,
            device_fingerprint: self.device_fingerprint.clone(),
            expires_at: self.expires_at,
        }
    }

    /// Rejoin a stored record with the raw token it was looked up by.
    pub fn from_record(record: SessionRecord, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: record.user_id,
            device_fingerprint: record.device_fingerprint,
            expires_at: record.expires_at,
        }
    }
}

/// A refresh session as persisted: the token only as its SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub device_fingerprint: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Signed, stateless access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// What a successful login, refresh or provider sign-in returns.
///
/// Never persisted; the refresh half is a copy of the stored session's
/// public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access: AccessToken, session: &RefreshSession) -> Self {
        Self {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: session.token.clone(),
            refresh_expires_at: session.expires_at,
        }
    }

    /// Value for an `Authorization` header.
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
