use crate::{config::IdentityConfig, error::*, models::*, repository::UserStore};
use logger_redacted::redact_email;
use std::sync::Arc;
use tracing::{debug, info};

/// Maps login keys and provider emails onto canonical identities.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn UserStore>,
    config: IdentityConfig,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn UserStore>, config: IdentityConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    pub async fn resolve(&self, key: &IdentityKey) -> Result<UserIdentity> {
        self.store.find(key).await?.ok_or(IdentityError::UserNotFound)
    }

    /// Never reports not-found: an unseen email gets a new password-less
    /// identity tagged with `provider`.
    pub async fn resolve_or_create_from_provider(
        &self,
        email: &str,
        provider: Provider,
    ) -> Result<UserIdentity> {
        let key = IdentityKey::email(email);
        if !matches!(&key, IdentityKey::Email(e) if e.contains('@')) {
            return Err(IdentityError::InvalidEmail);
        }

        if let Some(existing) = self.store.find(&key).await? {
            return self.relink(existing, provider).await;
        }

        let created = self
            .store
            .create(NewIdentity {
                email: email.to_string(),
                password_hash: None,
                roles: self.config.default_roles.clone(),
                provider,
            })
            .await;

        match created {
            Ok(identity) => {
                info!(
                    user_id = %identity.id,
                    email = %redact_email(&identity.email),
                    provider = %provider,
                    "Created identity from provider sign-in"
                );
                Ok(identity)
            }
            // A concurrent sign-in with the same email won the insert
            Err(IdentityError::EmailAlreadyInUse) => {
                let existing = self.resolve(&key).await?;
                self.relink(existing, provider).await
            }
            Err(e) => Err(e),
        }
    }

    async fn relink(&self, identity: UserIdentity, provider: Provider) -> Result<UserIdentity> {
        if identity.provider == provider {
            return Ok(identity);
        }
        debug!(
            user_id = %identity.id,
            from = %identity.provider,
            to = %provider,
            "Re-linking identity to provider"
        );
        self.store
            .update(identity.id, IdentityPatch {
                provider: Some(provider),
                ..Default::default()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUserStore;

    fn resolver() -> (Arc<InMemoryUserStore>, IdentityResolver) {
        let store = Arc::new(InMemoryUserStore::new());
        let resolver = IdentityResolver::new(store.clone(), IdentityConfig::default());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_not_found() {
        let (_, resolver) = resolver();
        let err = resolver.resolve(&IdentityKey::email("ghost@b.com")).await.unwrap_err();
        assert!(matches!(err, IdentityError::UserNotFound));
    }

    #[tokio::test]
    async fn test_provider_creates_passwordless_identity() {
        let (store, resolver) = resolver();
        let identity = resolver
            .resolve_or_create_from_provider("New@B.com", Provider::Google)
            .await
            .unwrap();

        assert_eq!(identity.email, "new@b.com");
        assert_eq!(identity.provider, Provider::Google);
        assert!(identity.password_hash.is_none());
        assert_eq!(identity.roles, vec![DEFAULT_ROLE.to_string()]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_relinks_existing_identity() {
        let (store, resolver) = resolver();
        let first = resolver
            .resolve_or_create_from_provider("a@b.com", Provider::Google)
            .await
            .unwrap();
        let second = resolver
            .resolve_or_create_from_provider("a@b.com", Provider::Github)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.provider, Provider::Github);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_rejects_non_email() {
        let (_, resolver) = resolver();
        let result = resolver
            .resolve_or_create_from_provider("   ", Provider::Github)
            .await;
        assert!(matches!(result, Err(IdentityError::InvalidEmail)));
    }
}
