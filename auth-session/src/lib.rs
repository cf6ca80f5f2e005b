//! Token issuance and rotating refresh sessions for Tessera
//!
//! - [`TokenIssuer`] mints short-lived, stateless access tokens through a
//!   pluggable [`TokenSigner`]
//! - [`RefreshSessionStore`] keeps one single-use refresh token per
//!   `(user, device)` pair
//! - [`SessionManager`] runs login, refresh, logout and provider sign-in on
//!   top of `auth-identity`
//!
//! Every failure leaving [`SessionManager`] is a [`SessionError`].
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{repository::InMemoryUserStore, IdentityConfig, IdentityResolver, Provider};
//! use auth_session::{InMemoryRefreshSessionStore, SessionConfig, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("change-me-to-a-long-random-value!");
//!     let resolver = IdentityResolver::new(Arc::new(InMemoryUserStore::new()), IdentityConfig::default());
//!     let store = Arc::new(InMemoryRefreshSessionStore::new(config.refresh_ttl()?));
//!     let manager = SessionManager::from_config(&config, resolver, store);
//!
//!     let pair = manager.provider_auth("user@example.com", "curl/8.0", Provider::Google).await?;
//!     let rotated = manager.refresh(&pair.refresh_token, "curl/8.0").await?;
//!     manager.logout(&rotated.refresh_token).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod signer;
pub mod store;
pub mod tokens;

pub use config::{DatabaseConfig, SessionConfig};
pub use error::{Result, SessionError, SignerError, StoreError};
pub use manager::SessionManager;
pub use models::{AccessToken, RefreshSession, SessionRecord, TokenPair};
pub use signer::{HmacSigner, TokenSigner};
pub use store::{
    InMemoryRefreshSessionStore, PostgresRefreshSessionStore, RefreshSessionStore, SessionTtl,
};
pub use tokens::{AccessClaims, TokenIssuer};
