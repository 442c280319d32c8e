//! axum-backed [`OAuthClient`]: serves the login redirect and the callback,
//! performs the code exchange, and hands the access token to the registered
//! handler.

mod config;
mod exchange;
mod http;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use axum::{
    Router,
    http::request::Parts,
    response::Response,
    routing::get,
};
use reqwest::Client;

use crate::{
    ClientCredentials, FederatedLoginError, OAuthClient, OAuthEndpoints, ProviderRoute,
    TokenHandler,
};

pub use config::OAuthRouterConfig;
use http::{FlowState, PendingAuthorizations, ProviderFlow, callback_handler, login_handler};

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct OAuthRouter {
    config: OAuthRouterConfig,
    http: Client,
    env: EnvLookup,
    flows: Vec<(String, String, FlowState)>,
}

impl OAuthRouter {
    pub fn new(config: OAuthRouterConfig) -> Result<Self, FederatedLoginError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: OAuthRouterConfig, http: Client) -> Self {
        Self {
            config,
            http,
            env: Arc::new(|key| std::env::var(key).ok()),
            flows: Vec::new(),
        }
    }

    /// Replaces the process environment as the source of conventional credentials.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Registered `(login, callback)` paths in registration order.
    pub fn paths(&self) -> Vec<(String, String)> {
        self.flows
            .iter()
            .map(|(login, callback, _)| (login.clone(), callback.clone()))
            .collect()
    }

    pub fn into_router(self) -> Router {
        self.flows
            .into_iter()
            .fold(Router::new(), |router, (login, callback, state)| {
                router
                    .route(&login, get(login_handler).with_state(state.clone()))
                    .route(&callback, get(callback_handler).with_state(state))
            })
    }

    fn endpoints(&self, route: &ProviderRoute) -> Result<OAuthEndpoints, FederatedLoginError> {
        route
            .service
            .endpoints()
            .ok_or_else(|| FederatedLoginError::Registration {
                provider: route.provider.name.clone(),
                message: format!("service `{}` has no oauth endpoints", route.service.id()),
            })
    }

    fn credentials(&self, route: &ProviderRoute) -> Result<ClientCredentials, FederatedLoginError> {
        let env = &self.env;
        route
            .provider
            .credentials
            .resolve_with(&route.provider.name, |key| env(key))
    }

    fn registered_paths(&self) -> HashSet<String> {
        self.flows
            .iter()
            .flat_map(|(login, callback, _)| [login.clone(), callback.clone()])
            .collect()
    }

    /// Claims both paths of `route` in `taken`, failing on any overlap.
    fn claim_paths(
        route: &ProviderRoute,
        taken: &mut HashSet<String>,
    ) -> Result<(), FederatedLoginError> {
        let registration_error = |message: String| FederatedLoginError::Registration {
            provider: route.provider.name.clone(),
            message,
        };
        if let Some(segment) = route
            .callback_path
            .segments()
            .iter()
            .find(|segment| segment.contains(['{', '}', '*']))
        {
            return Err(registration_error(format!(
                "path segment `{segment}` is not a literal route segment"
            )));
        }
        for path in [&route.login_path, &route.callback_path] {
            let path = path.to_string();
            if !taken.insert(path.clone()) {
                return Err(registration_error(format!("route {path} is already registered")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OAuthRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthRouter")
            .field("config", &self.config)
            .field("paths", &self.paths())
            .finish()
    }
}

impl OAuthClient for OAuthRouter {
    type Context = Parts;
    type Response = Response;

    fn validate(&self, routes: &[ProviderRoute]) -> Result<(), FederatedLoginError> {
        let mut taken = self.registered_paths();
        for route in routes {
            Self::claim_paths(route, &mut taken)?;
            self.endpoints(route)?;
            self.credentials(route)?;
            self.config.redirect_uri(&route.callback_path)?;
        }
        Ok(())
    }

    fn register_provider(
        &mut self,
        route: ProviderRoute,
        on_token: TokenHandler<Parts, Response>,
    ) -> Result<(), FederatedLoginError> {
        Self::claim_paths(&route, &mut self.registered_paths())?;
        let flow = ProviderFlow {
            name: route.provider.name.clone(),
            service_id: route.service.id().to_string(),
            endpoints: self.endpoints(&route)?,
            credentials: self.credentials(&route)?,
            redirect_uri: self.config.redirect_uri(&route.callback_path)?,
            scope: route.provider.scope.clone(),
            http: self.http.clone(),
            pending: PendingAuthorizations::new(self.config.state_ttl, self.config.max_pending),
            on_token,
        };
        self.flows.push((
            route.login_path.to_string(),
            route.callback_path.to_string(),
            FlowState(Arc::new(flow)),
        ));
        Ok(())
    }

    fn unregister_provider(&mut self, route: &ProviderRoute) {
        let login = route.login_path.to_string();
        self.flows.retain(|(existing, _, _)| *existing != login);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::LOCATION},
        response::IntoResponse,
    };
    use mockito::{Matcher, Server};
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::{
        Credentials, CustomService, FederatedIdentity, FederatedLoginConfig,
        FederatedLoginService, FederatedProvider, GoogleFetcher, IdentityResolver, OAuthService,
        ServiceRegistry,
    };

    fn router() -> OAuthRouter {
        OAuthRouter::new(OAuthRouterConfig::from_origin("https://app.example.com").unwrap())
            .unwrap()
            .with_env_lookup(|_| None)
    }

    fn explicit(provider: FederatedProvider) -> FederatedProvider {
        provider.with_credentials(Credentials::Client {
            id: "client-id".to_string(),
            secret: "client-secret".to_string(),
        })
    }

    async fn identity_page(
        _parts: Parts,
        identity: FederatedIdentity,
    ) -> Result<Response, FederatedLoginError> {
        Ok(format!("welcome {}", identity.identifier.value).into_response())
    }

    async fn send_get(router: &Router, uri: &str) -> Response {
        router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> Url {
        let location = response.headers()[LOCATION].to_str().unwrap();
        Url::parse(location).unwrap()
    }

    #[test]
    fn missing_conventional_credentials_register_nothing() {
        let mut client = router();
        let config = FederatedLoginConfig::new(vec![
            explicit(FederatedProvider::google()),
            FederatedProvider::github(),
        ]);

        let err = FederatedLoginService::default()
            .register(&mut client, &config, identity_page)
            .unwrap_err();

        assert!(matches!(
            err,
            FederatedLoginError::MissingCredentials { variable, .. } if variable == "GITHUB_CLIENT_ID"
        ));
        assert!(client.paths().is_empty());
    }

    #[test]
    fn conventional_credentials_come_from_env_lookup() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_CLIENT_ID", "test-client-id"),
            ("GITHUB_CLIENT_SECRET", "test-client-secret"),
        ]
        .into_iter()
        .collect();
        let mut client = router().with_env_lookup(move |key| env.get(key).map(|v| v.to_string()));
        let config =
            FederatedLoginConfig::new(vec![FederatedProvider::github()]).with_route_group(["auth", "oauth"]);

        FederatedLoginService::default()
            .register(&mut client, &config, identity_page)
            .unwrap();

        assert_eq!(
            client.paths(),
            vec![(
                "/auth/oauth/github".to_string(),
                "/auth/oauth/github/callback".to_string()
            )]
        );
    }

    #[test]
    fn service_without_endpoints_is_rejected() {
        let mut client = router();
        let service = FederatedLoginService::new(
            ServiceRegistry::default().with("bare", OAuthService::custom(CustomService::new("bare"))),
            IdentityResolver::default(),
        );
        let config = FederatedLoginConfig::new(vec![explicit(FederatedProvider::custom("bare"))]);

        let err = service
            .register(&mut client, &config, identity_page)
            .unwrap_err();
        assert!(matches!(err, FederatedLoginError::Registration { .. }));
    }

    #[test]
    fn registering_same_routes_twice_fails() {
        let mut client = router();
        let config = FederatedLoginConfig::new(vec![explicit(FederatedProvider::google())]);
        let service = FederatedLoginService::default();

        service.register(&mut client, &config, identity_page).unwrap();
        let err = service
            .register(&mut client, &config, identity_page)
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(client.paths().len(), 1);
    }

    #[test]
    fn overlapping_routes_in_one_batch_register_nothing() {
        let mut client = router();
        let service = FederatedLoginService::new(
            ServiceRegistry::empty()
                .with("a", OAuthService::GitHub)
                .with("a/callback", OAuthService::GitHub),
            IdentityResolver::default(),
        );
        let config = FederatedLoginConfig::new(vec![
            explicit(FederatedProvider::custom("a")),
            explicit(FederatedProvider::custom("a/callback")),
        ]);

        let err = service
            .register(&mut client, &config, identity_page)
            .unwrap_err();

        assert!(matches!(
            &err,
            FederatedLoginError::Registration { provider, message }
                if provider.as_str() == "a/callback" && message.contains("/connect/a/callback")
        ));
        assert!(client.paths().is_empty());
        let _ = client.into_router();
    }

    #[test]
    fn overlap_with_registered_callback_is_rejected() {
        let mut client = router();
        let service = FederatedLoginService::new(
            ServiceRegistry::empty()
                .with("a", OAuthService::GitHub)
                .with("a/callback", OAuthService::GitHub),
            IdentityResolver::default(),
        );
        service
            .register(
                &mut client,
                &FederatedLoginConfig::new(vec![explicit(FederatedProvider::custom("a"))]),
                identity_page,
            )
            .unwrap();

        let err = service
            .register(
                &mut client,
                &FederatedLoginConfig::new(vec![explicit(FederatedProvider::custom("a/callback"))]),
                identity_page,
            )
            .unwrap_err();

        assert!(matches!(err, FederatedLoginError::Registration { .. }));
        assert_eq!(client.paths().len(), 1);
        let _ = client.into_router();
    }

    #[test]
    fn pattern_characters_in_names_are_rejected() {
        let mut client = router();
        let service = FederatedLoginService::new(
            ServiceRegistry::empty().with("{id}", OAuthService::Google),
            IdentityResolver::default(),
        );
        let config = FederatedLoginConfig::new(vec![explicit(FederatedProvider::custom("{id}"))]);

        let err = service
            .register(&mut client, &config, identity_page)
            .unwrap_err();
        assert!(matches!(err, FederatedLoginError::Registration { .. }));
        assert!(client.paths().is_empty());
    }

    #[tokio::test]
    async fn login_redirects_to_authorize_url() {
        let mut client = router();
        let config = FederatedLoginConfig::new(vec![explicit(
            FederatedProvider::github().with_scope(["read:user", "user:email"]),
        )]);
        FederatedLoginService::default()
            .register(&mut client, &config, identity_page)
            .unwrap();
        let router = client.into_router();

        let response = send_get(&router, "/connect/github").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let url = location(&response);
        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(
            params["redirect_uri"],
            "https://app.example.com/connect/github/callback"
        );
        assert_eq!(params["scope"], "read:user user:email");
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(params.contains_key("code_challenge"));
        assert!(params.contains_key("state"));
    }

    #[tokio::test]
    async fn callback_rejects_unknown_state_and_missing_code() {
        let mut client = router();
        let config = FederatedLoginConfig::new(vec![explicit(FederatedProvider::google())]);
        FederatedLoginService::default()
            .register(&mut client, &config, identity_page)
            .unwrap();
        let router = client.into_router();

        let response = send_get(&router, "/connect/google/callback?code=abc&state=forged").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send_get(&router, "/connect/google/callback?state=forged").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send_get(&router, "/connect/google/callback?error=access_denied").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn full_flow_yields_identity_once_per_state() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "https://app.example.com/connect/acme/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "acme-token", "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/oauth2/v2/userinfo")
            .match_header("authorization", "Bearer acme-token")
            .with_status(200)
            .with_body(r#"{"id": "acme-7", "email": "u@acme.test", "verified_email": true}"#)
            .create_async()
            .await;

        let acme = CustomService::new("acme")
            .with_endpoints(OAuthEndpoints::new(
                format!("{}/authorize", server.url()),
                format!("{}/token", server.url()),
            ))
            .with_fetcher(GoogleFetcher::new().with_api_base(server.url()));
        let service = FederatedLoginService::new(
            ServiceRegistry::default().with("acme", OAuthService::custom(acme)),
            IdentityResolver::default(),
        );
        let config = FederatedLoginConfig::new(vec![explicit(FederatedProvider::custom("acme"))]);
        let mut client = router();
        service.register(&mut client, &config, identity_page).unwrap();
        let router = client.into_router();

        let login = send_get(&router, "/connect/acme").await;
        let params: HashMap<_, _> = location(&login).query_pairs().into_owned().collect();
        let callback = format!("/connect/acme/callback?code=auth-code&state={}", params["state"]);

        let response = send_get(&router, &callback).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"welcome acme-7");

        let replayed = send_get(&router, &callback).await;
        assert_eq!(replayed.status(), StatusCode::BAD_REQUEST);
    }
}
