//! Provider email lookup against mock Google and GitHub endpoints

use auth_identity::repository::{InMemoryUserStore, UserStore};
use auth_identity::{IdentityConfig, IdentityKey, IdentityResolver, Provider};
use auth_oauth::*;
use auth_session::{InMemoryRefreshSessionStore, SessionConfig, SessionManager};
use mockito::{Matcher, Server, ServerGuard};
use std::sync::Arc;

fn config_for(server: &ServerGuard) -> OAuthProviderConfig {
    OAuthProviderConfig {
        google_tokeninfo_url: format!("{}/oauth2/v3/tokeninfo", server.url()),
        github_api_url: server.url(),
        ..Default::default()
    }
}

fn github(server: &ServerGuard) -> GithubEmailFetcher {
    let config = config_for(server);
    GithubEmailFetcher::new(http_client(&config).unwrap(), config.github_api_url)
}

#[tokio::test]
async fn google_email_from_tokeninfo() {
    //* Given
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/oauth2/v3/tokeninfo")
        .match_query(Matcher::UrlEncoded("access_token".into(), "ya29.token".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email":"new@b.com","email_verified":"true","aud":"client"}"#)
        .expect(1)
        .create_async()
        .await;
    let config = config_for(&server);
    let fetcher = GoogleEmailFetcher::new(http_client(&config).unwrap(), config.google_tokeninfo_url);

    //* When
    let email = fetcher.fetch_verified_email("ya29.token").await.unwrap();

    //* Then
    mock.assert_async().await;
    assert_eq!(email, "new@b.com");
}

#[tokio::test]
async fn google_rejected_token_is_provider_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/oauth2/v3/tokeninfo")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error_description":"Invalid Value"}"#)
        .create_async()
        .await;
    let config = config_for(&server);
    let fetcher = GoogleEmailFetcher::new(http_client(&config).unwrap(), config.google_tokeninfo_url);

    let result = fetcher.fetch_verified_email("expired").await;

    assert!(matches!(result, Err(OAuthError::ExternalProviderError(_))));
}

#[tokio::test]
async fn github_public_profile_email() {
    let mut server = Server::new_async().await;
    let user = server
        .mock("GET", "/user")
        .match_header("authorization", "token gho_abc")
        .match_header("user-agent", Matcher::Regex("^tessera/".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login":"octocat","email":"octo@b.com"}"#)
        .expect(1)
        .create_async()
        .await;
    let emails = server.mock("GET", "/user/emails").expect(0).create_async().await;

    let email = github(&server).fetch_verified_email("gho_abc").await.unwrap();

    user.assert_async().await;
    emails.assert_async().await;
    assert_eq!(email, "octo@b.com");
}

#[tokio::test]
async fn github_private_email_uses_primary_verified_entry() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/user")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login":"octocat","email":null}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/user/emails")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"email":"old@b.com","primary":false,"verified":true},
                {"email":"unverified@b.com","primary":true,"verified":false},
                {"email":"main@b.com","primary":true,"verified":true}
            ]"#,
        )
        .create_async()
        .await;

    let email = github(&server).fetch_verified_email("gho_abc").await.unwrap();

    assert_eq!(email, "main@b.com");
}

#[tokio::test]
async fn github_falls_back_to_login_address() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/user")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login":"octocat"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/user/emails")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"email":"x@b.com","primary":false,"verified":false}]"#)
        .create_async()
        .await;

    let email = github(&server).fetch_verified_email("gho_abc").await.unwrap();

    assert_eq!(email, "octocat@github.com");
}

#[tokio::test]
async fn authenticator_signs_in_with_fetched_email() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/oauth2/v3/tokeninfo")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email":"new@b.com"}"#)
        .create_async()
        .await;

    let users = Arc::new(InMemoryUserStore::new());
    let sessions = SessionManager::from_config(
        &SessionConfig::new("oauth-test-secret"),
        IdentityResolver::new(users.clone(), IdentityConfig::default()),
        Arc::new(InMemoryRefreshSessionStore::default()),
    );
    let authenticator = ProviderAuthenticator::from_config(sessions.clone(), &config_for(&server)).unwrap();

    //* When
    let pair = authenticator
        .authenticate(Provider::Google, "ya29.token", "device1")
        .await
        .unwrap();

    //* Then
    let identity = users.find(&IdentityKey::email("new@b.com")).await.unwrap().unwrap();
    assert_eq!(identity.provider, Provider::Google);
    assert!(identity.password_hash.is_none());
    let claims = sessions.verify_access(&pair.access_token).unwrap();
    assert_eq!(claims.email, "new@b.com");
}

#[tokio::test]
async fn authenticator_without_fetcher_rejects_provider() {
    let sessions = SessionManager::from_config(
        &SessionConfig::new("oauth-test-secret"),
        IdentityResolver::new(Arc::new(InMemoryUserStore::new()), IdentityConfig::default()),
        Arc::new(InMemoryRefreshSessionStore::default()),
    );
    let authenticator = ProviderAuthenticator::new(sessions);

    let result = authenticator.authenticate(Provider::Github, "gho_abc", "device1").await;

    assert!(matches!(result, Err(OAuthError::UnsupportedProvider(Provider::Github))));
}
