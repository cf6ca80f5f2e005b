use auth_identity::Provider;
use auth_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("No email fetcher registered for provider {0}")]
    UnsupportedProvider(Provider),

    /// The provider answered, but not with something usable (non-2xx,
    /// rejected token).
    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("Provider returned no email address")]
    MissingEmail,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, OAuthError>;
