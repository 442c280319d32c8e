//! Federated sign-in for GitHub, Google, and custom OAuth providers.
//!
//! Provider configuration is turned into login/callback routes on an
//! [`OAuthClient`]. Once the client has exchanged the authorization code, the
//! access token is resolved into a [`FederatedIdentity`] and handed to the
//! application's completion handler.

mod config;
mod error;
mod identity;
#[cfg(feature = "router")]
mod oauth_router;
#[cfg(feature = "router")]
mod pkce;
mod providers;
mod registrar;
mod resolver;
mod service;

pub use config::{
    ClientCredentials, Credentials, FederatedLoginConfig, FederatedProvider, ProviderName,
    RoutePath,
};
pub use error::FederatedLoginError;
pub use identity::{FederatedIdentity, Identifier, IdentifierKind};
#[cfg(feature = "router")]
pub use oauth_router::{OAuthRouter, OAuthRouterConfig};
#[cfg(feature = "router")]
pub use pkce::PkcePair;
pub use providers::{GitHubFetcher, GoogleFetcher, ProfileFetcher};
pub use registrar::{BoxFuture, FederatedLoginService, OAuthClient, ProviderRoute, TokenHandler};
pub use resolver::IdentityResolver;
pub use service::{CustomService, OAuthEndpoints, OAuthService, ServiceRegistry};
