//! Access token claims and issuance
//!
//! Access tokens are stateless: validity is signature plus expiry, never a
//! store lookup.

use crate::error::SignerError;
use crate::models::AccessToken;
use crate::signer::TokenSigner;
use auth_identity::UserIdentity;
use chrono::{Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// JWT ID (unique per issued token)
    pub jti: String,

    pub email: String,

    /// Opaque role list, passed through from the identity
    pub roles: Vec<String>,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,

    pub iss: String,
}

impl AccessClaims {
    pub fn for_identity(identity: &UserIdentity, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: identity.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            roles: identity.roles.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: issuer.to_string(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, SignerError> {
        Uuid::parse_str(&self.sub).map_err(|_| SignerError::Invalid)
    }
}

/// Mints access tokens from identities.
#[derive(Clone)]
pub struct TokenIssuer {
    signer: Arc<dyn TokenSigner>,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(signer: Arc<dyn TokenSigner>, issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            signer,
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn issue_access(&self, identity: &UserIdentity) -> Result<AccessToken, SignerError> {
        let claims = AccessClaims::for_identity(identity, &self.issuer, self.ttl);
        let token = self.signer.sign(&claims)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| SignerError::Signing("expiry out of range".to_string()))?;
        Ok(AccessToken { token, expires_at })
    }

    /// Verify a token as presented by a client, with or without the
    /// `Bearer ` prefix.
    pub fn verify_access(&self, presented: &str) -> Result<AccessClaims, SignerError> {
        let token = presented
            .strip_prefix("Bearer ")
            .unwrap_or(presented)
            .trim();
        let claims = self.signer.verify(token)?;
        if claims.iss != self.issuer {
            return Err(SignerError::Invalid);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::HmacSigner;
    use auth_identity::{Provider, DEFAULT_ROLE};
    use secrecy::SecretString;

    fn identity() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password_hash: None,
            roles: vec![DEFAULT_ROLE.to_string(), "ADMIN".to_string()],
            provider: Provider::Password,
            is_blocked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issuer(ttl: Duration) -> TokenIssuer {
        let signer = HmacSigner::new(&SecretString::new("test-secret".to_string()));
        TokenIssuer::new(Arc::new(signer), "tessera", ttl)
    }

    #[test]
    fn test_issued_token_carries_identity_claims() {
        let issuer = issuer(Duration::minutes(5));
        let identity = identity();
        let access = issuer.issue_access(&identity).unwrap();

        let claims = issuer.verify_access(&access.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), identity.id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.roles, identity.roles);
        assert_eq!(claims.exp - claims.iat, 300);
        assert_eq!(access.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn test_each_issue_is_fresh() {
        let issuer = issuer(Duration::minutes(5));
        let identity = identity();
        let a = issuer.issue_access(&identity).unwrap();
        let b = issuer.issue_access(&identity).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_bearer_prefix_accepted() {
        let issuer = issuer(Duration::minutes(5));
        let access = issuer.issue_access(&identity()).unwrap();
        assert!(issuer.verify_access(&format!("Bearer {}", access.token)).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer(Duration::seconds(-10));
        let access = issuer.issue_access(&identity()).unwrap();
        assert_eq!(issuer.verify_access(&access.token), Err(SignerError::Expired));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let signer: Arc<dyn TokenSigner> =
            Arc::new(HmacSigner::new(&SecretString::new("test-secret".to_string())));
        let ours = TokenIssuer::new(signer.clone(), "tessera", Duration::minutes(5));
        let theirs = TokenIssuer::new(signer, "someone-else", Duration::minutes(5));

        let access = theirs.issue_access(&identity()).unwrap();
        assert_eq!(ours.verify_access(&access.token), Err(SignerError::Invalid));
    }
}
