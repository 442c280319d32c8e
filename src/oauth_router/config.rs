use std::time::Duration;

use url::Url;

use crate::{FederatedLoginError, RoutePath};

const DEFAULT_STATE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_MAX_PENDING: usize = 4096;

#[derive(Debug, Clone)]
pub struct OAuthRouterConfig {
    /// Public origin the provider redirects back to, e.g. `https://app.example.com`.
    pub origin: Url,
    /// How long an issued `state` stays valid.
    pub state_ttl: Duration,
    /// Upper bound on outstanding `state` values per provider; the oldest is
    /// evicted once it is reached.
    pub max_pending: usize,
    pub timeout: Option<Duration>,
}

impl OAuthRouterConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            state_ttl: DEFAULT_STATE_TTL,
            max_pending: DEFAULT_MAX_PENDING,
            timeout: None,
        }
    }

    pub fn from_origin(origin: &str) -> Result<Self, FederatedLoginError> {
        Ok(Self::new(Url::parse(origin)?))
    }

    pub fn with_state_ttl(mut self, state_ttl: Duration) -> Self {
        self.state_ttl = state_ttl;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Absolute callback URL: origin (with any base path) followed by `path`.
    pub fn redirect_uri(&self, path: &RoutePath) -> Result<String, FederatedLoginError> {
        let base = self.origin.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}{path}"))?;
        Ok(url.to_string())
    }
}
