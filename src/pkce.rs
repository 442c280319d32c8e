use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::FederatedLoginError;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkcePair {
    pub fn generate() -> Result<Self, FederatedLoginError> {
        Ok(Self::from_verifier(random_token()?))
    }

    /// S256 challenge for an existing verifier.
    pub fn from_verifier(code_verifier: impl Into<String>) -> Self {
        let code_verifier = code_verifier.into();
        let digest = Sha256::digest(code_verifier.as_bytes());
        Self {
            code_challenge: URL_SAFE_NO_PAD.encode(digest),
            code_verifier,
        }
    }
}

/// 32 random bytes, base64url without padding.
pub fn random_token() -> Result<String, FederatedLoginError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| FederatedLoginError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::{PkcePair, random_token};

    #[test]
    fn generates_url_safe_values() {
        let pkce = PkcePair::generate().unwrap();
        let state = random_token().unwrap();
        for value in [&pkce.code_verifier, &pkce.code_challenge, &state] {
            assert!(!value.contains('='), "values should be unpadded");
            assert!(!value.contains('+'), "values should be url safe");
            assert!(!value.contains('/'), "values should be url safe");
        }
        assert_ne!(state, pkce.code_verifier);
    }

    #[test]
    fn challenge_matches_rfc7636_example() {
        let pkce = PkcePair::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(
            pkce.code_challenge,
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}
