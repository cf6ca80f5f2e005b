use crate::client::{http_client, EmailFetcher, GithubEmailFetcher, GoogleEmailFetcher};
use crate::error::{OAuthError, Result};
use crate::models::OAuthProviderConfig;
use auth_identity::Provider;
use auth_session::{SessionManager, TokenPair};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Provider sign-in: fetch the email with the provider's token, then hand
/// it to [`SessionManager::provider_auth`].
pub struct ProviderAuthenticator {
    sessions: SessionManager,
    fetchers: HashMap<Provider, Arc<dyn EmailFetcher>>,
}

impl ProviderAuthenticator {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions,
            fetchers: HashMap::new(),
        }
    }

    /// Google and GitHub fetchers sharing one HTTP client.
    pub fn from_config(sessions: SessionManager, config: &OAuthProviderConfig) -> Result<Self> {
        let client = http_client(config)?;
        Ok(Self::new(sessions)
            .with_fetcher(Arc::new(GoogleEmailFetcher::new(
                client.clone(),
                config.google_tokeninfo_url.clone(),
            )))
            .with_fetcher(Arc::new(GithubEmailFetcher::new(
                client,
                config.github_api_url.clone(),
            ))))
    }

    /// Register (or replace) the fetcher for `fetcher.provider()`.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn EmailFetcher>) -> Self {
        self.fetchers.insert(fetcher.provider(), fetcher);
        self
    }

    #[instrument(skip(self, access_token, device_fingerprint))]
    pub async fn authenticate(
        &self,
        provider: Provider,
        access_token: &str,
        device_fingerprint: &str,
    ) -> Result<TokenPair> {
        let fetcher = self
            .fetchers
            .get(&provider)
            .ok_or(OAuthError::UnsupportedProvider(provider))?;

        let email = fetcher.fetch_verified_email(access_token).await.map_err(|e| {
            warn!(error = %e, "Provider email lookup failed");
            e
        })?;

        Ok(self.sessions.provider_auth(&email, device_fingerprint, provider).await?)
    }
}
