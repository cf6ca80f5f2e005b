use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Role granted to every newly created identity.
pub const DEFAULT_ROLE: &str = "USER";

/// Where an identity was first established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    Password,
    Google,
    Github,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Password => "PASSWORD",
            Provider::Google => "GOOGLE",
            Provider::Github => "GITHUB",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PASSWORD" => Ok(Provider::Password),
            "GOOGLE" => Ok(Provider::Google),
            "GITHUB" => Ok(Provider::Github),
            other => Err(format!("unknown provider tag: {other}")),
        }
    }
}

/// Canonical principal. Owned by the user store; this crate only reads it
/// and asks the store for creation or updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    /// Always stored normalized, see [`normalize_email`]
    pub email: String,
    /// Absent for accounts that only ever signed in through a provider
    pub password_hash: Option<String>,
    pub roles: Vec<String>,
    pub provider: Provider,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the caller supplies when asking the store to create an identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: Option<String>,
    pub roles: Vec<String>,
    pub provider: Provider,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct IdentityPatch {
    pub password_hash: Option<String>,
    pub roles: Option<Vec<String>>,
    pub provider: Option<Provider>,
    pub is_blocked: Option<bool>,
}

impl IdentityPatch {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.roles.is_none()
            && self.provider.is_none()
            && self.is_blocked.is_none()
    }

    /// Apply onto an in-memory copy. Stores use this so every backend
    /// interprets a patch the same way.
    pub fn apply_to(&self, identity: &mut UserIdentity) {
        if let Some(ref hash) = self.password_hash {
            identity.password_hash = Some(hash.clone());
        }
        if let Some(ref roles) = self.roles {
            identity.roles = roles.clone();
        }
        if let Some(provider) = self.provider {
            identity.provider = provider;
        }
        if let Some(blocked) = self.is_blocked {
            identity.is_blocked = blocked;
        }
        identity.updated_at = Utc::now();
    }
}

/// Lookup key: an id or an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    Id(Uuid),
    Email(String),
}

impl IdentityKey {
    /// Anything that parses as a UUID is an id; everything else is treated
    /// as an email and normalized.
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => IdentityKey::Id(id),
            Err(_) => IdentityKey::Email(normalize_email(raw)),
        }
    }

    pub fn email(email: &str) -> Self {
        IdentityKey::Email(normalize_email(email))
    }
}

impl From<Uuid> for IdentityKey {
    fn from(id: Uuid) -> Self {
        IdentityKey::Id(id)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Id(id) => write!(f, "id:{id}"),
            IdentityKey::Email(_) => f.write_str("email"),
        }
    }
}

/// Public projection of an identity, safe to hand to a transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserIdentity> for UserView {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            roles: identity.roles.clone(),
            updated_at: identity.updated_at,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
