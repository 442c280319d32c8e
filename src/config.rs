use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FederatedLoginError;

const DEFAULT_ROUTE_GROUP: &str = "connect";
const DEFAULT_REDIRECT_LOCATION: &str = "/";
const CALLBACK_SEGMENT: &str = "callback";

/// Machine-form provider identifier, compared by its string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderName(Cow<'static, str>);

impl ProviderName {
    pub const GITHUB: ProviderName = ProviderName(Cow::Borrowed("github"));
    pub const GOOGLE: ProviderName = ProviderName(Cow::Borrowed("google"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used for conventional credential variables, e.g. `MY_IDP`.
    pub fn env_prefix(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '-' | '.' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Read `{NAME}_CLIENT_ID` and `{NAME}_CLIENT_SECRET` from the environment.
    #[default]
    Conventional,
    Client { id: String, secret: String },
}

/// A resolved client id and secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn resolve(&self, provider: &ProviderName) -> Result<ClientCredentials, FederatedLoginError> {
        self.resolve_with(provider, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(
        &self,
        provider: &ProviderName,
        lookup: F,
    ) -> Result<ClientCredentials, FederatedLoginError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Client { id, secret } => Ok(ClientCredentials {
                id: id.clone(),
                secret: secret.clone(),
            }),
            Self::Conventional => {
                let prefix = provider.env_prefix();
                let read = |suffix: &str| {
                    let variable = format!("{prefix}_{suffix}");
                    lookup(&variable)
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| FederatedLoginError::MissingCredentials {
                            provider: provider.clone(),
                            variable,
                        })
                };
                Ok(ClientCredentials {
                    id: read("CLIENT_ID")?,
                    secret: read("CLIENT_SECRET")?,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedProvider {
    pub name: ProviderName,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub credentials: Credentials,
}

impl FederatedProvider {
    pub fn new(name: impl Into<ProviderName>) -> Self {
        Self {
            name: name.into(),
            scope: Vec::new(),
            credentials: Credentials::Conventional,
        }
    }

    pub fn github() -> Self {
        Self::new(ProviderName::GITHUB)
    }

    pub fn google() -> Self {
        Self::new(ProviderName::GOOGLE)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(ProviderName::new(name))
    }

    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// An ordered list of path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePath(Vec<String>);

impl RoutePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedLoginConfig {
    #[serde(default = "default_route_group")]
    pub route_group: Vec<String>,
    #[serde(default)]
    pub providers: Vec<FederatedProvider>,
    #[serde(default = "default_redirect_location")]
    pub redirect_location: String,
}

fn default_route_group() -> Vec<String> {
    vec![DEFAULT_ROUTE_GROUP.to_string()]
}

fn default_redirect_location() -> String {
    DEFAULT_REDIRECT_LOCATION.to_string()
}

impl Default for FederatedLoginConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FederatedLoginConfig {
    pub fn new(providers: Vec<FederatedProvider>) -> Self {
        Self {
            route_group: default_route_group(),
            providers,
            redirect_location: default_redirect_location(),
        }
    }

    pub fn with_route_group<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route_group = group.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_provider(mut self, provider: FederatedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_redirect_location(mut self, location: impl Into<String>) -> Self {
        self.redirect_location = location.into();
        self
    }

    pub fn login_path(&self, provider: &FederatedProvider) -> RoutePath {
        RoutePath::new(self.route_group.iter().cloned()).join(provider.name.as_str())
    }

    pub fn callback_path(&self, provider: &FederatedProvider) -> RoutePath {
        self.login_path(provider).join(CALLBACK_SEGMENT)
    }

    /// Fails on the first provider name that appears twice.
    pub fn validate(&self) -> Result<(), FederatedLoginError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(&provider.name) {
                return Err(FederatedLoginError::DuplicateProvider(
                    provider.name.clone(),
                ));
            }
        }
        Ok(())
    }
}
