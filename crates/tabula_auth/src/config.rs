//! Authentication configuration.

use std::time::Duration;

/// Configuration for an [`Authenticator`](crate::Authenticator).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of issued tokens.
    pub token_lifetime: Duration,
    /// Signing secret. When unset, a random secret is generated on first
    /// use and persisted with the user accounts.
    pub secret: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(60 * 60), // 1 hour
            secret: None,
        }
    }
}

impl AuthConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token lifetime.
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Sets an explicit signing secret.
    #[must_use]
    pub fn with_secret(mut self, secret: Vec<u8>) -> Self {
        self.secret = Some(secret);
        self
    }
}
