use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::{AppDataAccessError, Identity};

/// The only signing algorithm accepted by [TokenVerifier]
pub const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    email: Option<String>,
    level: Option<String>,
}

impl From<jsonwebtoken::errors::Error> for AppDataAccessError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidSignature => AppDataAccessError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => AppDataAccessError::UnsupportedAlgorithm,
            ErrorKind::ExpiredSignature => AppDataAccessError::Expired,
            ErrorKind::ImmatureSignature => AppDataAccessError::NotYetValid,
            _ => AppDataAccessError::MalformedToken(error.to_string()),
        }
    }
}

/// Verifies HS256-signed JSON web tokens against a shared secret and turns
/// their claims into an [Identity].
///
/// Tokens are issued elsewhere. `exp` and `nbf` are honoured when present
/// but not required; an `email` claim is.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// A verifier for tokens signed with `secret`
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_nbf = true;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Verifies the value of an `Authorization` header, which must be
    /// exactly `Bearer <token>`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Identity, AppDataAccessError> {
        let header = header.ok_or(AppDataAccessError::MissingCredential)?;
        let parts: Vec<&str> = header.split(' ').collect();

        match parts.as_slice() {
            ["Bearer", token] if !token.is_empty() => self.verify(token),
            _ => Err(AppDataAccessError::MalformedHeader),
        }
    }

    /// Verifies a bare token
    pub fn verify(&self, token: &str) -> Result<Identity, AppDataAccessError> {
        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)?.claims;

        let email = claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or(AppDataAccessError::MissingEmail)?;

        tracing::debug!(%email, level = ?claims.level, "verified bearer token");

        Ok(Identity {
            email,
            level: claims.level,
        })
    }
}
