use crate::{credentials::CredentialVerifier, error::*, models::*, resolver::IdentityResolver};
use logger_redacted::redact_email;
use tracing::info;

/// Password account registration.
pub struct IdentityService {
    resolver: IdentityResolver,
    verifier: CredentialVerifier,
}

impl IdentityService {
    pub fn new(resolver: IdentityResolver, verifier: CredentialVerifier) -> Self {
        Self { resolver, verifier }
    }

    /// Create a `PASSWORD` identity.
    ///
    /// Fails with [`IdentityError::EmailAlreadyInUse`] when the email is
    /// taken, whatever provider the existing identity came from.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserIdentity> {
        let email = normalize_email(email);
        if !self.is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }

        if self.resolver.store().find(&IdentityKey::Email(email.clone())).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        // Argon2 is deliberately slow; keep it off the async workers
        let verifier = self.verifier.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| IdentityError::InternalError(e.into()))??;

        // The store's uniqueness check still guards the window since `find`
        let user = self
            .resolver
            .store()
            .create(NewIdentity {
                email,
                password_hash: Some(password_hash),
                roles: self.resolver.config().default_roles.clone(),
                provider: Provider::Password,
            })
            .await?;

        info!(user_id = %user.id, email = %redact_email(&user.email), "Registered password account");
        Ok(user)
    }

    fn is_valid_email(&self, email: &str) -> bool {
        match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::IdentityConfig, repository::InMemoryUserStore};
    use std::sync::Arc;

    fn service() -> IdentityService {
        let store = Arc::new(InMemoryUserStore::new());
        IdentityService::new(
            IdentityResolver::new(store, IdentityConfig::default()),
            CredentialVerifier::new(),
        )
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let service = service();
        let user = service.register("User@Example.com", "hunter22").await.unwrap();

        assert_eq!(user.email, "user@example.com");
        assert_eq!(user.provider, Provider::Password);
        let hash = user.password_hash.as_deref();
        assert_ne!(hash, Some("hunter22"));
        assert!(CredentialVerifier::new().verify("hunter22", hash));
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let service = service();
        service.register("a@b.com", "pw123456").await.unwrap();
        let err = service.register("A@b.com", "other-pw").await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_email() {
        let service = service();
        let err = service.register("not-an-email", "pw123456").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidEmail));
    }
}
