//! Caller identity and ownership checks.
//!
//! Credential handling lives outside the core. Adapters hand a credential
//! to an [`IdentityVerifier`] and receive a [`Principal`]; the core only
//! compares principals against database owners.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Creates a principal from a user name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the user name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityFailure {
    /// The credential was valid but has expired.
    #[error("token expired")]
    Expired,
    /// The credential is malformed, forged or unknown.
    #[error("invalid token")]
    Invalid,
}

/// Resolves a credential into a principal.
pub trait IdentityVerifier {
    /// Verifies `credential`.
    ///
    /// # Errors
    ///
    /// Returns the reason the credential was rejected.
    fn verify(&self, credential: &str) -> Result<Principal, IdentityFailure>;
}

impl<V: IdentityVerifier + ?Sized> IdentityVerifier for &V {
    fn verify(&self, credential: &str) -> Result<Principal, IdentityFailure> {
        (**self).verify(credential)
    }
}
