use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::{
    FederatedIdentity, FederatedLoginError, FederatedProvider, GitHubFetcher, GoogleFetcher,
    OAuthService, ProfileFetcher,
};

/// Picks the fetcher for the service that issued a token.
///
/// Dispatch is on the bound service, not the provider name, so a custom name
/// backed by [`OAuthService::GitHub`] still resolves through GitHub.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    http: Client,
    github: GitHubFetcher,
    google: GoogleFetcher,
}

impl IdentityResolver {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            github: GitHubFetcher::default(),
            google: GoogleFetcher::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FederatedLoginError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http))
    }

    pub fn with_github(mut self, github: GitHubFetcher) -> Self {
        self.github = github;
        self
    }

    pub fn with_google(mut self, google: GoogleFetcher) -> Self {
        self.google = google;
        self
    }

    pub async fn resolve(
        &self,
        service: &OAuthService,
        access_token: &str,
        provider: &FederatedProvider,
    ) -> Result<FederatedIdentity, FederatedLoginError> {
        debug!(service = service.id(), provider = %provider.name, "resolving federated identity");
        match service {
            OAuthService::GitHub => self.github.fetch(&self.http, access_token, provider).await,
            OAuthService::Google => self.google.fetch(&self.http, access_token, provider).await,
            OAuthService::Custom(custom) => match custom.fetcher() {
                Some(fetcher) => fetcher.fetch(&self.http, access_token, provider).await,
                None => Err(FederatedLoginError::UnsupportedService(
                    custom.id().to_string(),
                )),
            },
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(Client::new())
    }
}
