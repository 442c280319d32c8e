mod github;
mod google;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{FederatedIdentity, FederatedLoginError, FederatedProvider};

pub use github::GitHubFetcher;
pub use google::GoogleFetcher;

/// Turns an access token into a normalized identity.
///
/// Implementations fetch the raw profile from their provider and map it into
/// a [`FederatedIdentity`]; they hold no per-call state.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch(
        &self,
        http: &Client,
        access_token: &str,
        provider: &FederatedProvider,
    ) -> Result<FederatedIdentity, FederatedLoginError>;
}

/// Sends the request and decodes a success body as JSON.
pub(crate) async fn send_json<T: DeserializeOwned>(
    builder: RequestBuilder,
    service: &str,
) -> Result<T, FederatedLoginError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(FederatedLoginError::Upstream {
            service: service.to_string(),
            status: status.as_u16(),
            message: body,
        });
    }

    serde_json::from_str(&body).map_err(|err| FederatedLoginError::InvalidResponse {
        service: service.to_string(),
        message: err.to_string(),
    })
}

/// `"github"` -> `"Github"`.
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn trim_base(base: impl Into<String>) -> String {
    let base = base.into();
    base.trim_end_matches('/').to_string()
}
