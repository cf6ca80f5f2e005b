use serde::Deserialize;

/// Provider endpoints and HTTP client settings.
///
/// Defaults point at the public Google and GitHub APIs; tests and proxies
/// override them.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProviderConfig {
    #[serde(default = "default_google_tokeninfo_url")]
    pub google_tokeninfo_url: String,

    /// Base URL of the GitHub REST API (no trailing slash)
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// GitHub rejects requests without a User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_google_tokeninfo_url() -> String {
    "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string()
}
fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_request_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    concat!("tessera/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for OAuthProviderConfig {
    fn default() -> Self {
        Self {
            google_tokeninfo_url: default_google_tokeninfo_url(),
            github_api_url: default_github_api_url(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Google `tokeninfo` response (only the fields we read)
#[derive(Debug, Deserialize)]
pub(crate) struct GoogleTokenInfo {
    pub email: Option<String>,
}

/// GitHub `GET /user` response
#[derive(Debug, Deserialize)]
pub(crate) struct GithubUser {
    pub login: String,
    pub email: Option<String>,
}

/// One entry of GitHub `GET /user/emails`
#[derive(Debug, Deserialize)]
pub(crate) struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}
