//! Per-provider email lookup
//!
//! The OAuth handshake has already happened by the time these run; each
//! fetcher turns a provider access token into the account's email.

use crate::error::{OAuthError, Result};
use crate::models::{GithubEmail, GithubUser, GoogleTokenInfo, OAuthProviderConfig};
use async_trait::async_trait;
use auth_identity::Provider;
use logger_redacted::redact_email;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Turns a provider access token into a verified email address.
#[async_trait]
pub trait EmailFetcher: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_verified_email(&self, access_token: &str) -> Result<String>;
}

/// Build the HTTP client shared by the fetchers.
pub fn http_client(config: &OAuthProviderConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?)
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OAuthError::ExternalProviderError(format!(
            "{what}: HTTP {status} - {body}"
        )));
    }
    Ok(response.json::<T>().await?)
}

pub struct GoogleEmailFetcher {
    client: Client,
    tokeninfo_url: String,
}

impl GoogleEmailFetcher {
    pub fn new(client: Client, tokeninfo_url: impl Into<String>) -> Self {
        Self {
            client,
            tokeninfo_url: tokeninfo_url.into(),
        }
    }
}

#[async_trait]
impl EmailFetcher for GoogleEmailFetcher {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn fetch_verified_email(&self, access_token: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        let info: GoogleTokenInfo = read_json(response, "Google tokeninfo").await?;
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or(OAuthError::MissingEmail)?;

        debug!(email = %redact_email(&email), "Fetched Google account email");
        Ok(email)
    }
}

/// GitHub lookup: the profile email when public, else the primary verified
/// address from `/user/emails`, else `<login>@github.com`.
pub struct GithubEmailFetcher {
    client: Client,
    api_url: String,
}

impl GithubEmailFetcher {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header(header::AUTHORIZATION, format!("token {access_token}"))
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        read_json(response, &format!("GitHub {path}")).await
    }
}

#[async_trait]
impl EmailFetcher for GithubEmailFetcher {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    async fn fetch_verified_email(&self, access_token: &str) -> Result<String> {
        let user: GithubUser = self.get("/user", access_token).await?;
        if let Some(email) = user.email.filter(|e| !e.is_empty()) {
            return Ok(email);
        }

        let emails: Vec<GithubEmail> = self.get("/user/emails", access_token).await?;
        let email = emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map_or_else(|| format!("{}@github.com", user.login), |e| e.email);

        debug!(email = %redact_email(&email), "Fetched GitHub account email");
        Ok(email)
    }
}
