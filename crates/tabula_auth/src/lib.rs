//! # Tabula Auth
//!
//! User accounts and signed session tokens for Tabula front ends.
//!
//! Passwords are stored as salted SHA-256 digests. Sessions are
//! HMAC-SHA256 signed tokens with an expiry, verified without any server
//! side session state. [`Authenticator`] implements
//! [`tabula_core::IdentityVerifier`], so it plugs straight into
//! [`tabula_core::Service`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tabula_auth::{AuthConfig, Authenticator};
//! use tabula_storage::InMemoryBackend;
//!
//! let auth = Authenticator::open(Arc::new(InMemoryBackend::new()), AuthConfig::default()).unwrap();
//! auth.register_user("alice", "s3cret").unwrap();
//! let token = auth.authenticate("alice", "s3cret").unwrap();
//! assert_eq!(auth.verify_token(&token).unwrap().as_str(), "alice");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod authenticator;
mod config;
mod error;

pub use authenticator::{Authenticator, USERS_DOCUMENT};
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
