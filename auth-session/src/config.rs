use crate::error::StoreError;
use crate::store::{SessionTtl, MAX_REFRESH_TTL_MONTHS};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment prefix, e.g. `TESSERA_SESSION__JWT_SECRET`.
pub const ENV_PREFIX: &str = "TESSERA";

#[derive(Error, Debug)]
#[error("Configuration error: {0}")]
pub struct ConfigError(String);

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError(err.to_string())
    }
}

/// Token issuance and refresh session policy
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for access tokens
    pub jwt_secret: SecretString,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: u64,

    /// Refresh session lifetime in calendar months, 1 to 12 (default: 1)
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_months: u32,
}

/// Upper bound on access token lifetime accepted from configuration (one day).
const MAX_ACCESS_TOKEN_TTL_SECS: u64 = 86_400;

/// Shortest accepted HMAC key, in bytes (the HS256 output size).
pub const MIN_JWT_SECRET_LEN: usize = 32;

fn default_issuer() -> String { "tessera".to_string() }
fn default_access_token_ttl() -> u64 { 900 } // 15 minutes
fn default_refresh_token_ttl() -> u32 { 1 }

impl SessionConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_token_ttl(),
            refresh_token_ttl_months: default_refresh_token_ttl(),
        }
    }

    /// Access token lifetime, capped at one day.
    pub fn access_token_ttl(&self) -> chrono::Duration {
        let secs = self.access_token_ttl_secs.min(MAX_ACCESS_TOKEN_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    pub fn refresh_ttl(&self) -> Result<SessionTtl, ConfigError> {
        SessionTtl::months(self.refresh_token_ttl_months).ok_or_else(|| {
            ConfigError(format!(
                "refresh_token_ttl_months must be between 1 and {MAX_REFRESH_TTL_MONTHS}, got {}",
                self.refresh_token_ttl_months
            ))
        })
    }

    /// Reject settings that would sign with a weak key or break session expiry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret_len = self.jwt_secret.expose_secret().len();
        if secret_len < MIN_JWT_SECRET_LEN {
            return Err(ConfigError(format!(
                "jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes, got {secret_len}"
            )));
        }
        self.refresh_ttl()?;
        Ok(())
    }

    /// Load the `session` section from `TESSERA_SESSION__*` variables
    /// (and `.env`, when present) and validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = load_section("session")?;
        config.validate()?;
        Ok(config)
    }
}

/// PostgreSQL connection settings shared by the stores
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Store calls fail fast instead of queueing behind a saturated pool
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 { 10 }
fn default_acquire_timeout() -> u64 { 5 }

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    pub async fn connect(&self) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;

        info!(max_connections = self.max_connections, "Database connection pool created");
        Ok(pool)
    }
}

/// Deserialize `TESSERA_<SECTION>__*` variables into `T`.
pub fn load_section<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    environment()?
        .get::<T>(section)
        .map_err(|e| ConfigError(format!("section `{section}`: {e}")))
}

/// Like [`load_section`], but a section with no variables at all yields `T::default()`.
pub fn load_section_or_default<T: DeserializeOwned + Default>(section: &str) -> Result<T, ConfigError> {
    match environment()?.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => Ok(T::default()),
        Err(e) => Err(ConfigError(format!("section `{section}`: {e}"))),
    }
}

fn environment() -> Result<config::Config, ConfigError> {
    // A missing .env file is normal outside development
    let _ = dotenvy::dotenv();

    Ok(config::Config::builder()
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SessionConfig = serde_json::from_str(r#"{"jwt_secret":"s3cr3t"}"#).unwrap();
        assert_eq!(config.jwt_secret.expose_secret(), "s3cr3t");
        assert_eq!(config.issuer, "tessera");
        assert_eq!(config.access_token_ttl_secs, 900);
        assert_eq!(config.refresh_token_ttl_months, 1);
        assert_eq!(config.access_token_ttl(), chrono::Duration::minutes(15));
    }

    #[test]
    fn test_access_ttl_is_capped() {
        let mut config = SessionConfig::new("s");
        config.access_token_ttl_secs = u64::MAX;
        assert_eq!(config.access_token_ttl(), chrono::Duration::days(1));
    }

    #[test]
    fn test_refresh_ttl_bounds() {
        let mut config = SessionConfig::new(LONG_SECRET);
        assert_eq!(config.refresh_ttl().unwrap().as_months(), 1);

        config.refresh_token_ttl_months = 12;
        assert!(config.validate().is_ok());

        for months in [0, 13, 100_000_000, u32::MAX] {
            config.refresh_token_ttl_months = months;
            assert!(config.refresh_ttl().is_err(), "{months} months accepted");
            assert!(config.validate().is_err(), "{months} months accepted");
        }
    }

    #[test]
    fn test_short_or_empty_secret_is_rejected() {
        for secret in ["", "s3cr3t", "0123456789abcdef0123456789abcde"] {
            let config: SessionConfig =
                serde_json::from_str(&format!(r#"{{"jwt_secret":"{secret}"}}"#)).unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("jwt_secret"), "{err}");
        }
        assert!(SessionConfig::new(LONG_SECRET).validate().is_ok());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result: Result<SessionConfig, _> = serde_json::from_str(r#"{"issuer":"x"}"#);
        assert!(result.is_err());
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Absent {
        value: Option<String>,
    }

    #[test]
    fn test_missing_optional_section_defaults() {
        let absent: Absent = load_section_or_default("no_such_section").unwrap();
        assert_eq!(absent, Absent::default());
    }

    #[test]
    fn test_from_env_reads_prefixed_variables() {
        std::env::set_var("TESSERA_SESSION__JWT_SECRET", LONG_SECRET);
        std::env::set_var("TESSERA_SESSION__ACCESS_TOKEN_TTL_SECS", "60");

        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.jwt_secret.expose_secret(), LONG_SECRET);
        assert_eq!(config.access_token_ttl_secs, 60);

        // Out-of-range lifetime fails at load time, not at first issuance
        std::env::set_var("TESSERA_SESSION__REFRESH_TOKEN_TTL_MONTHS", "4294967295");
        assert!(SessionConfig::from_env().is_err());

        std::env::remove_var("TESSERA_SESSION__JWT_SECRET");
        std::env::remove_var("TESSERA_SESSION__ACCESS_TOKEN_TTL_SECS");
        std::env::remove_var("TESSERA_SESSION__REFRESH_TOKEN_TTL_MONTHS");
    }
}
