use serde::{Deserialize, Serialize};

use crate::ProviderName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum IdentifierKind {
    Federated,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub provider: ProviderName,
    pub value: String,
}

impl Identifier {
    pub fn federated(provider: ProviderName, user_id: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::Federated,
            provider,
            value: user_id.into(),
        }
    }
}

/// A provider profile normalized into one shape.
///
/// `provider` is the human-readable label (`"Github"`), while
/// `identifier.provider` carries the configured machine name (`"github"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    pub identifier: Identifier,
    pub provider: String,
    pub verified_emails: Vec<String>,
    pub verified_phone_numbers: Vec<String>,
    pub display_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl FederatedIdentity {
    pub fn email(&self) -> Option<&str> {
        self.verified_emails.first().map(String::as_str)
    }

    pub fn phone(&self) -> Option<&str> {
        self.verified_phone_numbers.first().map(String::as_str)
    }
}
