//! Client options, set explicitly or read from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COGGLE_USER_AUTH_TOKEN` | (required) | User access token sent as `access_token` |
//! | `COGGLE_BASE_URL` | `https://coggle.it` | Service root, without a trailing slash |

pub const TOKEN_ENV: &str = "COGGLE_USER_AUTH_TOKEN";
pub const BASE_URL_ENV: &str = "COGGLE_BASE_URL";

/// Production service root.
pub const DEFAULT_BASE_URL: &str = "https://coggle.it";

/// Options accepted by `Api::new`. Validation happens at construction, so
/// an `ApiOptions` value may be incomplete.
#[derive(Debug, Clone, Default)]
pub struct ApiOptions {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

impl ApiOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Populate options from `COGGLE_USER_AUTH_TOKEN` and `COGGLE_BASE_URL`.
    /// Unset or empty variables are left as `None`.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            token: read(TOKEN_ENV),
            base_url: read(BASE_URL_ENV),
        }
    }

    /// The base URL to use, defaulted and with trailing slashes removed.
    pub(crate) fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }
}
