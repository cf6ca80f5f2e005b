use auth_identity::IdentityError;
use thiserror::Error;

/// Error classification handed to the transport layer.
///
/// `Unauthorized` deliberately carries no detail: unknown email, wrong
/// password, blocked account and invalid/expired/consumed refresh token all
/// collapse into it.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Identity already exists")]
    Conflict,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Identity creation failed: {0}")]
    CreationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Unauthorized => codes::UNAUTHORIZED,
            SessionError::Conflict => codes::CONFLICT,
            SessionError::StoreUnavailable(_) => codes::STORE_UNAVAILABLE,
            SessionError::CreationFailed(_) => codes::CREATION_FAILED,
            SessionError::Internal(_) => codes::INTERNAL,
        }
    }
}

pub mod codes {
    pub const UNAUTHORIZED: &str = "AUTH_2001";
    pub const CONFLICT: &str = "AUTH_2004";
    pub const CREATION_FAILED: &str = "AUTH_2005";
    pub const STORE_UNAVAILABLE: &str = "DB_4001";
    pub const INTERNAL: &str = "SYS_5001";
}

impl From<IdentityError> for SessionError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserNotFound => SessionError::Unauthorized,
            IdentityError::EmailAlreadyInUse => SessionError::Conflict,
            IdentityError::InvalidEmail => SessionError::CreationFailed(err.to_string()),
            IdentityError::StoreUnavailable(msg) => SessionError::StoreUnavailable(msg),
            IdentityError::DatabaseError(e) => SessionError::StoreUnavailable(e.to_string()),
            IdentityError::HashingError | IdentityError::InternalError(_) => {
                SessionError::Internal(err.to_string())
            }
        }
    }
}

/// Refresh session store failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transient: connection refused, pool exhausted, timeout
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Session store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) | StoreError::Backend(msg) => {
                SessionError::StoreUnavailable(msg)
            }
        }
    }
}

/// Access token signing or verification failure.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignerError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl From<SignerError> for SessionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Invalid | SignerError::Expired => SessionError::Unauthorized,
            SignerError::Signing(msg) => SessionError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
