//! Session Manager
//!
//! Orchestrates the four request flows. Each call runs one pass of
//! `UNAUTHENTICATED -> IDENTITY_RESOLVED -> TOKENS_ISSUED` (or stops at
//! `REJECTED`); nothing is held between calls and the only shared mutable
//! state is the refresh session store.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::models::TokenPair;
use crate::signer::HmacSigner;
use crate::store::RefreshSessionStore;
use crate::tokens::{AccessClaims, TokenIssuer};
use auth_identity::{
    CredentialVerifier, IdentityError, IdentityKey, IdentityResolver, Provider, UserIdentity,
};
use logger_redacted::{redact_email, redact_token};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionManager {
    resolver: IdentityResolver,
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    store: Arc<dyn RefreshSessionStore>,
}

impl SessionManager {
    pub fn new(
        resolver: IdentityResolver,
        verifier: CredentialVerifier,
        issuer: TokenIssuer,
        store: Arc<dyn RefreshSessionStore>,
    ) -> Self {
        Self {
            resolver,
            verifier,
            issuer,
            store,
        }
    }

    /// Wire an HS256 issuer from `config` around the given stores.
    pub fn from_config(
        config: &SessionConfig,
        resolver: IdentityResolver,
        store: Arc<dyn RefreshSessionStore>,
    ) -> Self {
        let signer = HmacSigner::new(&config.jwt_secret);
        let issuer = TokenIssuer::new(Arc::new(signer), config.issuer.clone(), config.access_token_ttl());
        Self::new(resolver, CredentialVerifier::new(), issuer, store)
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn store(&self) -> &Arc<dyn RefreshSessionStore> {
        &self.store
    }

    /// Password login.
    ///
    /// Unknown email, provider-only account, wrong password and blocked
    /// account all return the same [`SessionError::Unauthorized`].
    #[instrument(skip_all, fields(email = %redact_email(email)))]
    pub async fn login(&self, email: &str, password: &str, device_fingerprint: &str) -> Result<TokenPair> {
        let identity = match self.resolver.resolve(&IdentityKey::email(email)).await {
            Ok(identity) => Some(identity),
            Err(IdentityError::UserNotFound) => None,
            Err(e) => return Err(e.into()),
        };

        // An unknown email still pays for one verification
        let stored_hash = identity.as_ref().and_then(|identity| identity.password_hash.clone());
        let matches = self.password_matches(password, stored_hash).await?;
        let Some(identity) = identity.filter(|_| matches) else {
            return Err(reject("unknown email or password mismatch"));
        };
        if identity.is_blocked {
            return Err(reject("account blocked"));
        }

        let pair = self.issue_pair(&identity, device_fingerprint).await?;
        info!(user_id = %identity.id, "Login succeeded");
        Ok(pair)
    }

    /// Rotate a refresh token.
    ///
    /// The presented token is consumed before anything else is checked, so
    /// it is single-use even when the refresh is rejected.
    #[instrument(skip_all, fields(token = %redact_token(token)))]
    pub async fn refresh(&self, token: &str, device_fingerprint: &str) -> Result<TokenPair> {
        let session = self
            .store
            .redeem(token)
            .await?
            .ok_or_else(|| reject("unknown or already redeemed refresh token"))?;

        if session.is_expired() {
            return Err(reject("refresh token expired"));
        }

        let identity = self.resolver.resolve(&IdentityKey::Id(session.user_id)).await?;
        if identity.is_blocked {
            return Err(reject("account blocked"));
        }

        let pair = self.issue_pair(&identity, device_fingerprint).await?;
        debug!(user_id = %identity.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Sign-in with an email already verified by `provider`.
    ///
    /// Creates the identity on first sight. Store failures during
    /// resolution surface as `StoreUnavailable`, anything else as
    /// `CreationFailed`; never as `Unauthorized` unless the account is
    /// blocked.
    #[instrument(skip_all, fields(email = %redact_email(email), provider = %provider))]
    pub async fn provider_auth(
        &self,
        email: &str,
        device_fingerprint: &str,
        provider: Provider,
    ) -> Result<TokenPair> {
        let identity = self
            .resolver
            .resolve_or_create_from_provider(email, provider)
            .await
            .map_err(|e| {
                warn!(error = %e, "Provider identity resolution failed");
                if e.is_unavailable() {
                    SessionError::StoreUnavailable(e.to_string())
                } else {
                    SessionError::CreationFailed(e.to_string())
                }
            })?;

        if identity.is_blocked {
            return Err(reject("account blocked"));
        }

        let pair = self.issue_pair(&identity, device_fingerprint).await?;
        info!(user_id = %identity.id, "Provider sign-in succeeded");
        Ok(pair)
    }

    /// Revoke one refresh token. Unknown or already revoked tokens are not
    /// an error; only a failing store is.
    #[instrument(skip_all, fields(token = %redact_token(token)))]
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.revoke(token).await?;
        debug!("Logged out");
        Ok(())
    }

    /// Revoke every refresh session of a user, returning how many were live.
    #[instrument(skip(self))]
    pub async fn logout_everywhere(&self, user_id: Uuid) -> Result<u64> {
        let revoked = self.store.revoke_all_for_user(user_id).await?;
        info!(revoked, "Revoked all sessions");
        Ok(revoked)
    }

    /// Check an access token as presented by a client.
    pub fn verify_access(&self, presented: &str) -> Result<AccessClaims> {
        Ok(self.issuer.verify_access(presented)?)
    }

    async fn password_matches(&self, password: &str, stored_hash: Option<String>) -> Result<bool> {
        let verifier = self.verifier.clone();
        let password = password.to_string();

        // Hash verification is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || verifier.verify(&password, stored_hash.as_deref()))
            .await
            .map_err(|e| SessionError::Internal(format!("Password verification task failed: {e}")))
    }

    async fn issue_pair(&self, identity: &UserIdentity, device_fingerprint: &str) -> Result<TokenPair> {
        let access = self.issuer.issue_access(identity)?;
        let session = self.store.issue_for(identity.id, device_fingerprint).await?;
        debug!(
            user_id = %identity.id,
            refresh_token = %redact_token(&session.token),
            expires_at = %session.expires_at,
            "Issued token pair"
        );
        Ok(TokenPair::new(access, &session))
    }
}

fn reject(reason: &'static str) -> SessionError {
    debug!(reason, "Rejected");
    SessionError::Unauthorized
}
