use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    header::{ACCEPT, USER_AGENT},
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ProfileFetcher, capitalize, send_json, trim_base};
use crate::{FederatedIdentity, FederatedLoginError, FederatedProvider, Identifier};

const API_BASE: &str = "https://api.github.com";
const DEFAULT_USER_AGENT: &str = "federated-login";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

const SERVICE: &str = "GitHub";
const SERVICE_ID: &str = "github";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    verified: bool,
}

/// Reads `/user` and `/user/emails`.
///
/// Only the profile call is required. Any failure of the emails call
/// (status, transport, or decode) leaves the identity without verified emails.
#[derive(Debug, Clone)]
pub struct GitHubFetcher {
    api_base: String,
    user_agent: String,
}

impl Default for GitHubFetcher {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GitHubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = trim_base(api_base);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn get(&self, http: &Client, path: &str, access_token: &str) -> RequestBuilder {
        http.get(format!("{}{path}", self.api_base))
            .bearer_auth(access_token)
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, &self.user_agent)
    }

    async fn fetch_user(
        &self,
        http: &Client,
        access_token: &str,
    ) -> Result<GitHubUser, FederatedLoginError> {
        send_json(self.get(http, "/user", access_token), SERVICE).await
    }

    async fn fetch_emails(
        &self,
        http: &Client,
        access_token: &str,
    ) -> Result<Vec<GitHubEmail>, FederatedLoginError> {
        let builder = self
            .get(http, "/user/emails", access_token)
            .header(API_VERSION_HEADER, API_VERSION);
        send_json(builder, SERVICE).await
    }

    async fn fetch_verified_emails(&self, http: &Client, access_token: &str) -> Vec<String> {
        match self.fetch_emails(http, access_token).await {
            Ok(emails) => emails
                .into_iter()
                .filter(|entry| entry.verified)
                .map(|entry| entry.email)
                .collect(),
            Err(err) => {
                warn!(error = %err, "github emails unavailable, continuing without verified emails");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ProfileFetcher for GitHubFetcher {
    async fn fetch(
        &self,
        http: &Client,
        access_token: &str,
        provider: &FederatedProvider,
    ) -> Result<FederatedIdentity, FederatedLoginError> {
        let (user, verified_emails) = tokio::join!(
            self.fetch_user(http, access_token),
            self.fetch_verified_emails(http, access_token),
        );
        let user = user?;
        debug!(login = %user.login, provider = %provider.name, "fetched github profile");

        Ok(FederatedIdentity {
            identifier: Identifier::federated(provider.name.clone(), user.id.to_string()),
            provider: capitalize(SERVICE_ID),
            verified_emails,
            verified_phone_numbers: Vec::new(),
            display_name: user.name,
            profile_picture_url: user.avatar_url,
        })
    }
}
