use crate::error::StoreError;
use crate::models::{RefreshSession, SessionRecord};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Months, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

pub use postgres::PostgresRefreshSessionStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable home of refresh sessions.
///
/// Invariants every implementation upholds:
/// - at most one live session per `(user_id, device_fingerprint)`;
///   `issue_for` replaces rather than adds, atomically per pair
/// - `redeem` deletes and returns in one step, so of two concurrent
///   redeems of the same token exactly one sees the session
/// - only [`hash_refresh_token`] digests are persisted; the raw token leaves
///   the store once, in the session `issue_for` returns
///
/// Failures are reported, never retried here.
#[async_trait]
pub trait RefreshSessionStore: Send + Sync {
    async fn issue_for(&self, user_id: Uuid, device_fingerprint: &str) -> StoreResult<RefreshSession>;

    /// Consume a token. Expired rows are still returned (and removed);
    /// judging expiry is the caller's job.
    async fn redeem(&self, token: &str) -> StoreResult<Option<RefreshSession>>;

    /// Idempotent: revoking an unknown token is not an error.
    async fn revoke(&self, token: &str) -> StoreResult<()>;

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<SessionRecord>>;

    /// Delete every session with `expires_at <= now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Longest refresh session lifetime, in months.
pub const MAX_REFRESH_TTL_MONTHS: u32 = 12;

/// Fixed absolute lifetime of a refresh session, 1 to
/// [`MAX_REFRESH_TTL_MONTHS`] calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    months: u32,
}

impl SessionTtl {
    /// `None` outside `1..=MAX_REFRESH_TTL_MONTHS`.
    pub fn months(months: u32) -> Option<Self> {
        (1..=MAX_REFRESH_TTL_MONTHS)
            .contains(&months)
            .then_some(Self { months })
    }

    pub fn as_months(&self) -> u32 {
        self.months
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> StoreResult<DateTime<Utc>> {
        now.checked_add_months(Months::new(self.months)).ok_or_else(|| {
            StoreError::Backend(format!("expiry {} months after {now} is out of range", self.months))
        })
    }
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self { months: 1 }
    }
}

/// 32 random bytes, URL-safe base64 (cookie and header safe).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of a refresh token, URL-safe base64. The only form stores keep.
pub fn hash_refresh_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

type PairKey = (Uuid, String);

/// In-memory refresh session store for testing and development
///
/// `sessions` is authoritative for the one-per-pair invariant; `tokens`
/// indexes the same records by token digest. Lock order is always
/// `sessions` then `tokens`, never the reverse.
pub struct InMemoryRefreshSessionStore {
    sessions: Arc<DashMap<PairKey, SessionRecord>>,
    tokens: Arc<DashMap<String, SessionRecord>>,
    ttl: SessionTtl,
}

impl InMemoryRefreshSessionStore {
    pub fn new(ttl: SessionTtl) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            tokens: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Insert a session exactly as given, replacing any session for its pair.
    /// For fixtures and imports; normal issuance goes through `issue_for`.
    pub fn seed(&self, session: RefreshSession) {
        self.put(session.record());
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn put(&self, record: SessionRecord) {
        let key = (record.user_id, record.device_fingerprint.clone());
        match self.sessions.entry(key) {
            Entry::Occupied(mut slot) => {
                self.tokens.insert(record.token_hash.clone(), record.clone());
                let previous = slot.insert(record);
                self.tokens.remove(&previous.token_hash);
            }
            Entry::Vacant(slot) => {
                self.tokens.insert(record.token_hash.clone(), record.clone());
                slot.insert(record);
            }
        }
    }

    fn take(&self, token: &str) -> Option<SessionRecord> {
        // Removing from the index is the linearization point: only one caller
        // can get the entry back.
        let (_, record) = self.tokens.remove(&hash_refresh_token(token))?;
        self.sessions.remove_if(
            &(record.user_id, record.device_fingerprint.clone()),
            |_, current| current.token_hash == record.token_hash,
        );
        Some(record)
    }

    fn remove_where(&self, predicate: impl Fn(&SessionRecord) -> bool) -> u64 {
        let mut removed = 0u64;
        self.sessions.retain(|_, record| {
            if predicate(record) {
                self.tokens.remove(&record.token_hash);
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

impl Default for InMemoryRefreshSessionStore {
    fn default() -> Self {
        Self::new(SessionTtl::default())
    }
}

#[async_trait]
impl RefreshSessionStore for InMemoryRefreshSessionStore {
    async fn issue_for(&self, user_id: Uuid, device_fingerprint: &str) -> StoreResult<RefreshSession> {
        let session = RefreshSession {
            token: generate_token(),
            user_id,
            device_fingerprint: device_fingerprint.to_string(),
            expires_at: self.ttl.expiry_from(Utc::now())?,
        };
        self.put(session.record());
        Ok(session)
    }

    async fn redeem(&self, token: &str) -> StoreResult<Option<RefreshSession>> {
        Ok(self
            .take(token)
            .map(|record| RefreshSession::from_record(record, token)))
    }

    async fn revoke(&self, token: &str) -> StoreResult<()> {
        self.take(token);
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(self.remove_where(|record| record.user_id == user_id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<SessionRecord>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        Ok(self.remove_where(|record| record.is_expired_at(now)))
    }
}
