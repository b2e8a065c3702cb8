//! Error types for authentication.

use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username already registered.
    #[error("user {0} already exists")]
    UserExists(String),

    /// Unknown user or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Token signature was valid but its lifetime has passed.
    #[error("token expired")]
    TokenExpired,

    /// Token is malformed, forged or names an unknown user.
    #[error("invalid token")]
    InvalidToken,

    /// Rejected username or password.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Signing key could not be used.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tabula_storage::StorageError),

    /// User document encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl AuthError {
    /// Returns true if the caller supplied bad credentials or tokens.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UserExists(_)
                | Self::InvalidCredentials
                | Self::TokenExpired
                | Self::InvalidToken
                | Self::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors() {
        assert!(AuthError::TokenExpired.is_client_error());
        assert!(AuthError::UserExists("a".into()).is_client_error());
        assert!(!AuthError::Crypto("bad key".into()).is_client_error());
        assert_eq!(
            AuthError::UserExists("bob".into()).to_string(),
            "user bob already exists"
        );
    }
}
