use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use tracing::debug;

use crate::providers::send_json;
use crate::{ClientCredentials, FederatedLoginError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub(super) struct TokenRequest<'a> {
    pub(super) code: &'a str,
    pub(super) redirect_uri: &'a str,
    pub(super) code_verifier: &'a str,
    pub(super) credentials: &'a ClientCredentials,
}

/// Trades an authorization code for an access token.
///
/// Some providers (GitHub) answer a rejected code with `200` and an `error`
/// field, so a body without `access_token` is treated as a denial.
pub(super) async fn exchange_code(
    http: &Client,
    token_url: &str,
    service: &str,
    request: TokenRequest<'_>,
) -> Result<String, FederatedLoginError> {
    let payload = [
        ("grant_type", "authorization_code"),
        ("code", request.code),
        ("redirect_uri", request.redirect_uri),
        ("client_id", request.credentials.id.as_str()),
        ("client_secret", request.credentials.secret.as_str()),
        ("code_verifier", request.code_verifier),
    ];
    let builder = http
        .post(token_url)
        .header(ACCEPT, "application/json")
        .form(&payload);
    let token: TokenResponse = send_json(builder, &format!("{service} token")).await?;

    match token.access_token {
        Some(access_token) => {
            debug!(service, token_type = token.token_type.as_deref(), "exchanged authorization code");
            Ok(access_token)
        }
        None => Err(FederatedLoginError::AuthorizationDenied {
            error: token.error.unwrap_or_else(|| "missing access_token".to_string()),
            description: token.error_description,
        }),
    }
}
