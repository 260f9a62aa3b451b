use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_API_URL: &str = "http://localhost:3223";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub portal_email: Option<String>,
    pub portal_password: Option<String>,
    pub portal_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("PORTAL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("PORTAL_API_URL not set, using default");
                    DEFAULT_API_URL.to_string()
                }),
            request_timeout_secs: env::var("PORTAL_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| match raw.parse::<u64>() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!("PORTAL_REQUEST_TIMEOUT_SECS is not a number: {}", raw);
                        None
                    }
                })
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            portal_email: non_empty_var("PORTAL_EMAIL"),
            portal_password: non_empty_var("PORTAL_PASSWORD"),
            portal_token: non_empty_var("PORTAL_TOKEN"),
        };

        if !config.is_configured() {
            warn!("Portal client not fully configured - set PORTAL_TOKEN or PORTAL_EMAIL/PORTAL_PASSWORD");
        }

        config
    }

    /// Config pointing at `base_url` with no credentials.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            portal_email: None,
            portal_password: None,
            portal_token: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
            && (self.portal_token.is_some() || self.has_credentials())
    }

    pub fn has_credentials(&self) -> bool {
        self.portal_email.is_some() && self.portal_password.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
