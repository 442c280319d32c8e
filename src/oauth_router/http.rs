use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, Request, State},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::exchange::{TokenRequest, exchange_code};
use crate::pkce::{PkcePair, random_token};
use crate::{ClientCredentials, FederatedLoginError, OAuthEndpoints, ProviderName, TokenHandler};

struct Pending {
    code_verifier: String,
    issued_at: Instant,
}

/// Issued `state` values awaiting their callback. Each is single-use, and at
/// most `capacity` are held at once.
pub(super) struct PendingAuthorizations {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Pending>>,
}

impl PendingAuthorizations {
    pub(super) fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(super) fn insert(&self, state: String, code_verifier: String) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, pending| pending.issued_at.elapsed() < ttl);
            while entries.len() >= self.capacity {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, pending)| pending.issued_at)
                    .map(|(state, _)| state.clone())
                else {
                    break;
                };
                tracing::debug!("pending oauth states at capacity, evicting oldest");
                entries.remove(&oldest);
            }
            entries.insert(
                state,
                Pending {
                    code_verifier,
                    issued_at: Instant::now(),
                },
            );
        }
    }

    /// Removes `state` and returns its verifier if it has not expired.
    pub(super) fn take(&self, state: &str) -> Option<String> {
        let pending = self.entries.lock().ok()?.remove(state)?;
        (pending.issued_at.elapsed() < self.ttl).then_some(pending.code_verifier)
    }
}

pub(super) struct ProviderFlow {
    pub(super) name: ProviderName,
    pub(super) service_id: String,
    pub(super) endpoints: OAuthEndpoints,
    pub(super) credentials: ClientCredentials,
    pub(super) redirect_uri: String,
    pub(super) scope: Vec<String>,
    pub(super) http: Client,
    pub(super) pending: PendingAuthorizations,
    pub(super) on_token: TokenHandler<Parts, Response>,
}

impl ProviderFlow {
    fn authorization_url(&self) -> Result<Url, FederatedLoginError> {
        let pkce = PkcePair::generate()?;
        let state = random_token()?;

        let mut url = Url::parse(&self.endpoints.authorize_url)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &self.credentials.id);
            pairs.append_pair("redirect_uri", &self.redirect_uri);
            if !self.scope.is_empty() {
                pairs.append_pair("scope", &self.scope.join(" "));
            }
            pairs.append_pair("state", &state);
            pairs.append_pair("code_challenge", &pkce.code_challenge);
            pairs.append_pair("code_challenge_method", "S256");
        }

        self.pending.insert(state, pkce.code_verifier);
        Ok(url)
    }

    async fn complete(&self, request: Request) -> Result<Response, FederatedLoginError> {
        let (parts, _body) = request.into_parts();
        let Query(params) = Query::<CallbackParams>::try_from_uri(&parts.uri)
            .map_err(|_| FederatedLoginError::MissingAuthorizationCode)?;

        if let Some(error) = params.error {
            return Err(FederatedLoginError::AuthorizationDenied {
                error,
                description: params.error_description,
            });
        }
        let code = params
            .code
            .ok_or(FederatedLoginError::MissingAuthorizationCode)?;
        let code_verifier = params
            .state
            .and_then(|state| self.pending.take(&state))
            .ok_or(FederatedLoginError::StateMismatch)?;

        let access_token = exchange_code(
            &self.http,
            &self.endpoints.token_url,
            &self.service_id,
            TokenRequest {
                code: &code,
                redirect_uri: &self.redirect_uri,
                code_verifier: &code_verifier,
                credentials: &self.credentials,
            },
        )
        .await?;

        tracing::debug!(provider = %self.name, "oauth callback completed");
        (self.on_token)(parts, access_token).await
    }
}

#[derive(Clone)]
pub(super) struct FlowState(pub(super) Arc<ProviderFlow>);

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub(super) async fn login_handler(State(flow): State<FlowState>) -> Response {
    match flow.0.authorization_url() {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(super) async fn callback_handler(State(flow): State<FlowState>, request: Request) -> Response {
    match flow.0.complete(request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}
