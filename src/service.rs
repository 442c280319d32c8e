use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{ProfileFetcher, ProviderName};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthEndpoints {
    pub fn new(authorize_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            authorize_url: authorize_url.into(),
            token_url: token_url.into(),
        }
    }
}

/// A service outside the built-in set.
///
/// Without a fetcher the service can still be registered with an OAuth
/// client, but resolving its tokens fails with `UnsupportedService`.
#[derive(Clone)]
pub struct CustomService {
    id: String,
    endpoints: Option<OAuthEndpoints>,
    fetcher: Option<Arc<dyn ProfileFetcher>>,
}

impl CustomService {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoints: None,
            fetcher: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: OAuthEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl ProfileFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fetcher(&self) -> Option<&Arc<dyn ProfileFetcher>> {
        self.fetcher.as_ref()
    }
}

impl fmt::Debug for CustomService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomService")
            .field("id", &self.id)
            .field("endpoints", &self.endpoints)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

/// The OAuth service implementation a provider name is bound to.
#[derive(Debug, Clone)]
pub enum OAuthService {
    GitHub,
    Google,
    Custom(CustomService),
}

impl OAuthService {
    pub fn custom(service: CustomService) -> Self {
        Self::Custom(service)
    }

    pub fn id(&self) -> &str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
            Self::Custom(service) => service.id(),
        }
    }

    pub fn endpoints(&self) -> Option<OAuthEndpoints> {
        match self {
            Self::GitHub => Some(OAuthEndpoints::new(GITHUB_AUTHORIZE_URL, GITHUB_TOKEN_URL)),
            Self::Google => Some(OAuthEndpoints::new(GOOGLE_AUTHORIZE_URL, GOOGLE_TOKEN_URL)),
            Self::Custom(service) => service.endpoints.clone(),
        }
    }
}

/// Name -> service lookup used when registering routes.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: HashMap<ProviderName, OAuthService>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::empty()
            .with(ProviderName::GITHUB, OAuthService::GitHub)
            .with(ProviderName::GOOGLE, OAuthService::Google)
    }
}

impl ServiceRegistry {
    pub fn empty() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<ProviderName>, service: OAuthService) -> Self {
        self.insert(name, service);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<ProviderName>,
        service: OAuthService,
    ) -> Option<OAuthService> {
        self.services.insert(name.into(), service)
    }

    pub fn get(&self, name: &ProviderName) -> Option<&OAuthService> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
