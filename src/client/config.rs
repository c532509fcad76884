//! Client configuration. Values are public; do not store secrets here.

use std::time::Duration;

const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the tessera server, e.g. `https://shop.example.com`.
    pub api_base_url: String,
    /// Where `sign_out` navigates afterwards.
    pub login_path: String,
    /// Per-request timeout. `None` leaves calls unbounded.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Joins the API base URL and `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let base = self.api_base_url.trim().trim_end_matches('/');
        let path = path.trim();

        if base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }
}
