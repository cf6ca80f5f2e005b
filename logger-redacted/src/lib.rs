//! Logging bootstrap and credential redaction for Tessera
//!
//! Authentication code logs a lot of identifying material: emails on every
//! login attempt, refresh tokens on rotation, provider access tokens during
//! provider sign-in. None of it may reach a log sink in the clear.
//!
//! - [`redact_email`] / [`redact_token`] produce stable, correlatable masks
//!   for structured tracing fields.
//! - [`PiiRedactor`] masks emails, `Bearer` headers and bare JWTs in free text.
//! - [`init`] installs the global `tracing` subscriber.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{redact_email, LoggerConfig};
//!
//! let _ = logger_redacted::init(&LoggerConfig::default());
//! tracing::info!(email = %redact_email("user@example.com"), "login attempt");
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set.
///
/// # Errors
///
/// Returns [`LoggerError::InvalidFilter`] for an unparsable level directive and
/// [`LoggerError::AlreadyInitialized`] when called twice in one process.
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}
