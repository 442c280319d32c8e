use thiserror::Error;

use crate::ProviderName;

#[derive(Debug, Error)]
pub enum FederatedLoginError {
    #[error("unsupported provider: no oauth service registered for `{0}`")]
    UnsupportedProvider(ProviderName),

    #[error("provider `{0}` is configured more than once")]
    DuplicateProvider(ProviderName),

    #[error("missing credentials for provider `{provider}`: {variable} is not set")]
    MissingCredentials {
        provider: ProviderName,
        variable: String,
    },

    #[error("failed to register provider `{provider}`: {message}")]
    Registration {
        provider: ProviderName,
        message: String,
    },

    #[error("unsupported oauth service: {0}")]
    UnsupportedService(String),

    #[error("{service} API returned status {status}: {message}")]
    Upstream {
        service: String,
        status: u16,
        message: String,
    },

    #[error("invalid {service} API response: {message}")]
    InvalidResponse { service: String, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing authorization code in callback")]
    MissingAuthorizationCode,

    #[error("authorization denied by provider: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("unknown or expired oauth state")]
    StateMismatch,

    #[error("os rng error: {message}")]
    OsRng { message: String },
}

impl FederatedLoginError {
    /// Errors raised while wiring providers at startup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedProvider(_)
                | Self::DuplicateProvider(_)
                | Self::MissingCredentials { .. }
                | Self::Registration { .. }
        )
    }

    /// Errors caused by a provider API call, decode failures included.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::InvalidResponse { .. } | Self::Http(_)
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

#[cfg(feature = "router")]
impl axum::response::IntoResponse for FederatedLoginError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            Self::MissingAuthorizationCode
            | Self::AuthorizationDenied { .. }
            | Self::StateMismatch => StatusCode::BAD_REQUEST,
            err if err.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "federated login failed");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::FederatedLoginError;
    use crate::ProviderName;

    #[test]
    fn classifies_configuration_and_upstream_errors() {
        let duplicate = FederatedLoginError::DuplicateProvider(ProviderName::GITHUB);
        assert!(duplicate.is_configuration());
        assert!(!duplicate.is_upstream());

        let decode = FederatedLoginError::InvalidResponse {
            service: "Google".to_string(),
            message: "expected value".to_string(),
        };
        assert!(decode.is_upstream());
        assert_eq!(decode.status(), None);
    }

    #[test]
    fn upstream_message_names_service_and_status() {
        let err = FederatedLoginError::Upstream {
            service: "GitHub".to_string(),
            status: 401,
            message: "Bad credentials".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.to_string(),
            "GitHub API returned status 401: Bad credentials"
        );
    }
}
