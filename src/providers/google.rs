use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ProfileFetcher, capitalize, send_json, trim_base};
use crate::{FederatedIdentity, FederatedLoginError, FederatedProvider, Identifier};

const API_BASE: &str = "https://www.googleapis.com";
const USERINFO_PATH: &str = "/oauth2/v2/userinfo";

const SERVICE: &str = "Google";
const SERVICE_ID: &str = "google";

#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    verified_email: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct GoogleFetcher {
    api_base: String,
}

impl Default for GoogleFetcher {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
        }
    }
}

impl GoogleFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = trim_base(api_base);
        self
    }
}

#[async_trait]
impl ProfileFetcher for GoogleFetcher {
    async fn fetch(
        &self,
        http: &Client,
        access_token: &str,
        provider: &FederatedProvider,
    ) -> Result<FederatedIdentity, FederatedLoginError> {
        let builder = http
            .get(format!("{}{USERINFO_PATH}", self.api_base))
            .bearer_auth(access_token);
        let user: GoogleUser = send_json(builder, SERVICE).await?;
        debug!(provider = %provider.name, "fetched google profile");

        let verified_emails = match (user.email, user.verified_email) {
            (Some(email), Some(true)) => vec![email],
            _ => Vec::new(),
        };

        Ok(FederatedIdentity {
            identifier: Identifier::federated(provider.name.clone(), user.id),
            provider: capitalize(SERVICE_ID),
            verified_emails,
            verified_phone_numbers: Vec::new(),
            display_name: user.name,
            profile_picture_url: user.picture,
        })
    }
}
