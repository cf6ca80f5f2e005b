//! Provider sign-in for Tessera
//!
//! Everything between "the OAuth handshake finished" and
//! [`auth_session::SessionManager::provider_auth`]:
//! - [`EmailFetcher`], one implementation per provider (Google tokeninfo,
//!   GitHub user and emails API)
//! - [`ProviderAuthenticator`], dispatching a provider access token to the
//!   right fetcher and issuing a token pair for the resulting email

pub mod client;
pub mod error;
pub mod models;
pub mod provider;

pub use client::*;
pub use error::*;
pub use models::OAuthProviderConfig;
pub use provider::*;
