use crate::{models::*, error::*};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

pub use postgres::PostgresUserStore;

/// Persistent user record store.
///
/// Implementations must enforce email uniqueness themselves: `create` for an
/// email that already exists fails with [`IdentityError::EmailAlreadyInUse`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, key: &IdentityKey) -> Result<Option<UserIdentity>>;
    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity>;
    /// Fails with [`IdentityError::UserNotFound`] when `id` is unknown.
    async fn update(&self, id: Uuid, patch: IdentityPatch) -> Result<UserIdentity>;
}

/// In-memory user store for testing and development
pub struct InMemoryUserStore {
    users: Arc<DashMap<Uuid, UserIdentity>>,
    email_index: Arc<DashMap<String, Uuid>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            email_index: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, key: &IdentityKey) -> Result<Option<UserIdentity>> {
        let id = match key {
            IdentityKey::Id(id) => *id,
            IdentityKey::Email(email) => match self.email_index.get(&normalize_email(email)) {
                Some(entry) => *entry.value(),
                None => return Ok(None),
            },
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity> {
        let email = normalize_email(&identity.email);

        // The index entry holds its shard lock until the user row is written,
        // so two creates for one email cannot both succeed.
        match self.email_index.entry(email.clone()) {
            Entry::Occupied(_) => Err(IdentityError::EmailAlreadyInUse),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = UserIdentity {
                    id: Uuid::new_v4(),
                    email,
                    password_hash: identity.password_hash,
                    roles: identity.roles,
                    provider: identity.provider,
                    is_blocked: false,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn update(&self, id: Uuid, patch: IdentityPatch) -> Result<UserIdentity> {
        let mut entry = self.users.get_mut(&id).ok_or(IdentityError::UserNotFound)?;
        patch.apply_to(entry.value_mut());
        Ok(entry.value().clone())
    }
}
