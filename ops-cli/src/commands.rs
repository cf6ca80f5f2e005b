use anyhow::{Context as _, Result};
use auth_identity::repository::{PostgresUserStore, UserStore};
use auth_identity::{
    CredentialVerifier, IdentityConfig, IdentityKey, IdentityResolver, IdentityService, Provider,
    UserIdentity, UserView,
};
use auth_oauth::{OAuthProviderConfig, ProviderAuthenticator};
use auth_session::config::{load_section, load_section_or_default};
use auth_session::{
    DatabaseConfig, HmacSigner, PostgresRefreshSessionStore, RefreshSessionStore, SessionConfig,
    SessionManager, SessionTtl, TokenIssuer,
};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

/// Stores and settings shared by the database-backed commands.
struct Backend {
    users: Arc<PostgresUserStore>,
    sessions: Arc<PostgresRefreshSessionStore>,
    resolver: IdentityResolver,
}

impl Backend {
    async fn connect() -> Result<Self> {
        let database = DatabaseConfig::from_env()?;
        // Maintenance commands run without a signing key; the lifetime then
        // falls back to the default
        let refresh_ttl = match load_section::<SessionConfig>("session") {
            Ok(config) => config.refresh_ttl()?,
            Err(_) => SessionTtl::default(),
        };

        let pool = database.connect().await.context("connecting to the database")?;
        let users = Arc::new(PostgresUserStore::new(pool.clone()));
        let sessions = Arc::new(PostgresRefreshSessionStore::new(pool, refresh_ttl));
        let resolver = IdentityResolver::new(users.clone(), IdentityConfig::default());

        Ok(Self {
            users,
            sessions,
            resolver,
        })
    }

    async fn user(&self, raw: &str) -> Result<UserIdentity> {
        self.users
            .find(&IdentityKey::parse(raw))
            .await?
            .with_context(|| format!("no user matches {raw:?}"))
    }
}

pub async fn migrate() -> Result<()> {
    let backend = Backend::connect().await?;
    backend.users.ensure_schema().await?;
    backend.sessions.ensure_schema().await?;
    println!("{} users, refresh_sessions", "schema ready:".green());
    Ok(())
}

pub async fn purge_expired() -> Result<()> {
    let backend = Backend::connect().await?;
    let purged = backend.sessions.purge_expired(Utc::now()).await?;
    info!(purged, "Purged expired refresh sessions");
    println!("{} {purged}", "purged:".green());
    Ok(())
}

pub async fn sessions(user: &str) -> Result<()> {
    let backend = Backend::connect().await?;
    let identity = backend.user(user).await?;
    let sessions = backend.sessions.list_for_user(identity.id).await?;

    if sessions.is_empty() {
        println!("{}", "no live sessions".yellow());
        return Ok(());
    }
    let now = Utc::now();
    for session in sessions {
        let state = if session.is_expired_at(now) {
            "expired".red()
        } else {
            "live".green()
        };
        println!("{state:8} {}  expires {}", session.device_fingerprint, session.expires_at);
    }
    Ok(())
}

pub async fn revoke_user(user: &str) -> Result<()> {
    let backend = Backend::connect().await?;
    let identity = backend.user(user).await?;
    let revoked = backend.sessions.revoke_all_for_user(identity.id).await?;
    println!("{} {revoked} session(s) for {}", "revoked".green(), identity.id);
    Ok(())
}

pub async fn register(email: &str, password: &str) -> Result<()> {
    let backend = Backend::connect().await?;
    let service = IdentityService::new(backend.resolver.clone(), CredentialVerifier::new());
    let identity = service.register(email, password).await?;
    print_json(&UserView::from(&identity))
}

/// Offline check; needs only `TESSERA_SESSION__JWT_SECRET`.
pub fn verify_token(token: &str) -> Result<()> {
    let config = SessionConfig::from_env()?;
    let issuer = TokenIssuer::new(
        Arc::new(HmacSigner::new(&config.jwt_secret)),
        config.issuer.clone(),
        config.access_token_ttl(),
    );

    let claims = issuer.verify_access(token)?;
    let expires = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .map_or_else(|| claims.exp.to_string(), |at| at.to_rfc3339());

    println!("{} {}", "valid, subject".green(), claims.sub);
    println!("  email   {}", claims.email);
    println!("  roles   {}", claims.roles.join(","));
    println!("  expires {expires}");
    Ok(())
}

pub async fn provider_login(provider: Provider, token: &str, device: &str) -> Result<()> {
    let backend = Backend::connect().await?;
    let session_config = SessionConfig::from_env()?;
    let oauth_config: OAuthProviderConfig = load_section_or_default("oauth")?;

    let manager = SessionManager::from_config(
        &session_config,
        backend.resolver.clone(),
        backend.sessions.clone(),
    );
    let pair = ProviderAuthenticator::from_config(manager, &oauth_config)?
        .authenticate(provider, token, device)
        .await?;
    print_json(&pair)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
