use thiserror::Error;

/// Reasons an inbound credential could not be turned into an [Identity](crate::Identity)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppDataAccessError {
    /// No credential was presented at all
    #[error("Missing credential")]
    MissingCredential,

    /// The `Authorization` header was not of the form `Bearer <token>`
    #[error("Malformed authorization header")]
    MalformedHeader,

    /// The token could not be split or decoded
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token was signed with an algorithm other than HS256
    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    /// The signature did not match the configured secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token's `exp` claim lies in the past
    #[error("Token expired")]
    Expired,

    /// The token's `nbf` claim lies in the future
    #[error("Token is not valid yet")]
    NotYetValid,

    /// The token's claims do not name a principal
    #[error("Token does not carry an email claim")]
    MissingEmail,
}
