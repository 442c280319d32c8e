use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    FederatedIdentity, FederatedLoginConfig, FederatedLoginError, FederatedProvider,
    IdentityResolver, OAuthService, RoutePath, ServiceRegistry,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Invoked by the OAuth client with `(request context, access token)` once
/// the authorization code has been exchanged.
pub type TokenHandler<C, R> =
    Arc<dyn Fn(C, String) -> BoxFuture<'static, Result<R, FederatedLoginError>> + Send + Sync>;

/// Everything an OAuth client needs to serve one provider.
#[derive(Debug, Clone)]
pub struct ProviderRoute {
    pub provider: FederatedProvider,
    pub service: OAuthService,
    pub login_path: RoutePath,
    pub callback_path: RoutePath,
}

/// The component that performs the redirect and code exchange.
pub trait OAuthClient {
    type Context: Send + 'static;
    type Response: Send + 'static;

    /// Checks the whole batch before any route of it is registered.
    fn validate(&self, _routes: &[ProviderRoute]) -> Result<(), FederatedLoginError> {
        Ok(())
    }

    fn register_provider(
        &mut self,
        route: ProviderRoute,
        on_token: TokenHandler<Self::Context, Self::Response>,
    ) -> Result<(), FederatedLoginError>;

    /// Removes a route registered earlier in a batch that failed later on.
    fn unregister_provider(&mut self, route: &ProviderRoute);
}

/// Registers configured providers and turns their tokens into identities.
#[derive(Debug, Clone, Default)]
pub struct FederatedLoginService {
    registry: ServiceRegistry,
    resolver: Arc<IdentityResolver>,
}

impl FederatedLoginService {
    pub fn new(registry: ServiceRegistry, resolver: IdentityResolver) -> Self {
        Self {
            registry,
            resolver: Arc::new(resolver),
        }
    }

    /// Computes the routes for `config` without registering anything.
    pub fn routes(
        &self,
        config: &FederatedLoginConfig,
    ) -> Result<Vec<ProviderRoute>, FederatedLoginError> {
        config.validate()?;
        config
            .providers
            .iter()
            .map(|provider| {
                let service = self
                    .registry
                    .get(&provider.name)
                    .cloned()
                    .ok_or_else(|| FederatedLoginError::UnsupportedProvider(provider.name.clone()))?;
                Ok(ProviderRoute {
                    provider: provider.clone(),
                    service,
                    login_path: config.login_path(provider),
                    callback_path: config.callback_path(provider),
                })
            })
            .collect()
    }

    /// Registers every configured provider with `client`, or none of them.
    ///
    /// `on_identity` receives the normalized identity for each successful
    /// callback; its response is returned to the OAuth client.
    pub fn register<C, F, Fut>(
        &self,
        client: &mut C,
        config: &FederatedLoginConfig,
        on_identity: F,
    ) -> Result<(), FederatedLoginError>
    where
        C: OAuthClient,
        F: Fn(C::Context, FederatedIdentity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C::Response, FederatedLoginError>> + Send + 'static,
    {
        let routes = self.routes(config)?;
        client.validate(&routes)?;

        let on_identity = Arc::new(on_identity);
        let mut registered: Vec<ProviderRoute> = Vec::with_capacity(routes.len());
        for route in routes {
            debug!(
                provider = %route.provider.name,
                service = route.service.id(),
                login = %route.login_path,
                callback = %route.callback_path,
                "registering federated provider"
            );
            let handler = self.token_handler(&route, on_identity.clone());
            if let Err(err) = client.register_provider(route.clone(), handler) {
                warn!(
                    provider = %route.provider.name,
                    rolled_back = registered.len(),
                    error = %err,
                    "provider registration failed, rolling back"
                );
                for done in registered.iter().rev() {
                    client.unregister_provider(done);
                }
                return Err(err);
            }
            registered.push(route);
        }
        Ok(())
    }

    fn token_handler<C, R, F, Fut>(
        &self,
        route: &ProviderRoute,
        on_identity: Arc<F>,
    ) -> TokenHandler<C, R>
    where
        C: Send + 'static,
        R: Send + 'static,
        F: Fn(C, FederatedIdentity) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, FederatedLoginError>> + Send + 'static,
    {
        let resolver = self.resolver.clone();
        let service = route.service.clone();
        let provider = route.provider.clone();

        Arc::new(
            move |context: C, access_token: String| -> BoxFuture<'static, Result<R, FederatedLoginError>> {
                let resolver = resolver.clone();
                let service = service.clone();
                let provider = provider.clone();
                let on_identity = on_identity.clone();
                Box::pin(async move {
                    let identity = resolver.resolve(&service, &access_token, &provider).await?;
                    on_identity(context, identity).await
                })
            },
        )
    }
}
