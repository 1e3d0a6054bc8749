use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons the request gate or the credential manager refused a call.
///
/// Every variant surfaces to clients as the same "unauthenticated" outcome; the
/// distinction only exists for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("malformed authorization value")]
    Malformed,
    #[error("wrong authorization scheme")]
    WrongScheme,
    #[error("invalid token")]
    InvalidToken,
}

/// Failures of the envelope crypto service.
///
/// A tampered ciphertext and a ciphertext opened with another tenant's key both
/// yield [`CryptoError::AuthenticationFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("ciphertext is shorter than the nonce")]
    Truncated,
    #[error("message authentication failed")]
    AuthenticationFailed,
    #[error("failed to encrypt payload")]
    EncryptionFailed,
    #[error("decrypted metadata is not valid utf-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("no tenant identity is bound to the call")]
    IdentityResolution,
    #[error("login `{login}` already exists")]
    AlreadyExists { login: String },
    #[error("{entity} not found")]
    NotFound { entity: String },
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("login or password is invalid")]
    InvalidCredentials,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("operation {0} is not implemented")]
    Unimplemented(&'static str),
}

impl Error {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    pub fn storage(message: impl ToString) -> Self {
        Self::Storage(message.to_string())
    }

    /// Whether the caller may reasonably retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
