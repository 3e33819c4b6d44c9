use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;

use crate::{ALGORITHM, AppDataAccessError};

/// Issues tokens that a [TokenVerifier](crate::TokenVerifier) configured with
/// the same secret accepts. Only meant for tests.
#[derive(Clone)]
pub struct TokenSigner {
    key: EncodingKey,
}

impl TokenSigner {
    /// A signer using `secret`
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Signs `claims` with HS256
    pub fn sign(&self, claims: &Value) -> Result<String, AppDataAccessError> {
        self.sign_with_algorithm(ALGORITHM, claims)
    }

    /// Signs `claims` with another HMAC algorithm
    pub fn sign_with_algorithm(
        &self,
        algorithm: Algorithm,
        claims: &Value,
    ) -> Result<String, AppDataAccessError> {
        Ok(jsonwebtoken::encode(
            &Header::new(algorithm),
            claims,
            &self.key,
        )?)
    }

    /// An `Authorization` header value carrying a token for `email` at
    /// `level`
    pub fn bearer(&self, email: &str, level: &str) -> Result<String, AppDataAccessError> {
        let token = self.sign(&serde_json::json!({ "email": email, "level": level }))?;
        Ok(format!("Bearer {token}"))
    }
}
