//! Identity management for Tessera
//!
//! This crate owns the "who is this?" half of authentication:
//! - [`UserIdentity`], the canonical principal, and its store ([`UserStore`])
//! - [`IdentityResolver`], mapping an email/id or a provider email onto an identity
//! - [`CredentialVerifier`], checking passwords against stored hashes
//! - [`IdentityService`], password account registration
//!
//! Token issuance and refresh sessions live in `auth-session`.
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{
//!     CredentialVerifier, IdentityConfig, IdentityResolver, IdentityService,
//!     repository::InMemoryUserStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = IdentityResolver::new(Arc::new(InMemoryUserStore::new()), IdentityConfig::default());
//!     let service = IdentityService::new(resolver, CredentialVerifier::new());
//!
//!     let user = service.register("user@example.com", "password123").await?;
//!     assert!(CredentialVerifier::new().verify("password123", user.password_hash.as_deref()));
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod repository;
pub mod resolver;
pub mod credentials;
pub mod service;
pub mod config;
pub mod error;

pub use models::*;
pub use resolver::*;
pub use credentials::*;
pub use service::*;
pub use config::*;
pub use error::*;
