//! User registry and token issuing.
//!
//! ## Token Format
//!
//! ```text
//! <username>.<expiry unix millis>.<hex HMAC-SHA256 of "<username>.<expiry>">
//! ```
//!
//! Usernames may contain dots; tokens are split from the right.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tabula_core::{IdentityFailure, IdentityVerifier, Principal};
use tabula_storage::StorageBackend;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Document holding the user accounts and the signing secret.
pub const USERS_DOCUMENT: &str = "users.json";

const SALT_LEN: usize = 16;
const SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    salt: String,
    password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserDocument {
    secret: String,
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

/// Registers users, checks passwords and issues signed tokens.
pub struct Authenticator {
    backend: Arc<dyn StorageBackend>,
    config: AuthConfig,
    secret: Vec<u8>,
    document: RwLock<UserDocument>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("users", &self.document.read().users.len())
            .field("token_lifetime", &self.config.token_lifetime)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Loads the user document from `backend`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns a storage or codec error, or a crypto error if the stored
    /// secret is not valid hex.
    pub fn open(backend: Arc<dyn StorageBackend>, config: AuthConfig) -> AuthResult<Self> {
        let document = match backend.read(USERS_DOCUMENT)? {
            Some(data) => serde_json::from_slice::<UserDocument>(&data)?,
            None => {
                let mut secret = [0u8; SECRET_LEN];
                rand::thread_rng().fill_bytes(&mut secret);
                let document = UserDocument {
                    secret: hex_encode(&secret),
                    users: BTreeMap::new(),
                };
                backend.write(USERS_DOCUMENT, &serde_json::to_vec_pretty(&document)?)?;
                info!("user registry initialized");
                document
            }
        };

        let secret = match &config.secret {
            Some(secret) => secret.clone(),
            None => hex_decode(&document.secret)
                .ok_or_else(|| AuthError::Crypto("stored secret is not valid hex".into()))?,
        };

        Ok(Self {
            backend,
            config,
            secret,
            document: RwLock::new(document),
        })
    }

    /// Returns the number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.document.read().users.len()
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// Returns `UserExists` for a taken username, `InvalidInput` for an
    /// empty username or password, or a persistence error. On failure no
    /// user is added.
    pub fn register_user(&self, username: &str, password: &str) -> AuthResult<()> {
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidInput(format!(
                "invalid username {username:?}"
            )));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }

        let mut document = self.document.write();
        if document.users.contains_key(username) {
            return Err(AuthError::UserExists(username.to_string()));
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let record = UserRecord {
            salt: hex_encode(&salt),
            password_hash: hex_encode(&hash_password(&salt, password)),
        };

        document.users.insert(username.to_string(), record);
        if let Err(e) = self.save(&document) {
            document.users.remove(username);
            return Err(e);
        }

        info!(user = username, "user registered");
        Ok(())
    }

    /// Checks a password and issues a token for the user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown user or wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<String> {
        let valid = match self.document.read().users.get(username) {
            Some(record) => self.password_matches(record, password)?,
            None => false,
        };
        if !valid {
            debug!(user = username, "authentication rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token_at(username, SystemTime::now())?;
        info!(user = username, "user authenticated");
        Ok(token)
    }

    /// Issues a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if the signing key is unusable.
    pub fn issue_token_at(&self, username: &str, now: SystemTime) -> AuthResult<String> {
        let expiry = unix_millis(now).saturating_add(
            u64::try_from(self.config.token_lifetime.as_millis()).unwrap_or(u64::MAX),
        );
        let payload = format!("{username}.{expiry}");
        let signature = hex_encode(&self.sign(payload.as_bytes())?);
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies a token and returns the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenExpired` for a correctly signed token past its expiry,
    /// and `InvalidToken` for anything else that does not verify.
    pub fn verify_token(&self, token: &str) -> AuthResult<Principal> {
        self.verify_token_at(token, SystemTime::now())
    }

    /// Verifies a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::verify_token`].
    pub fn verify_token_at(&self, token: &str, now: SystemTime) -> AuthResult<Principal> {
        let mut parts = token.rsplitn(3, '.');
        let (Some(signature), Some(expiry), Some(username)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let signature = hex_decode(signature).ok_or(AuthError::InvalidToken)?;
        let payload = &token[..username.len() + 1 + expiry.len()];
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let expiry: u64 = expiry.parse().map_err(|_| AuthError::InvalidToken)?;
        if unix_millis(now) > expiry {
            return Err(AuthError::TokenExpired);
        }
        if !self.document.read().users.contains_key(username) {
            return Err(AuthError::InvalidToken);
        }

        Ok(Principal::new(username))
    }

    /// Compares password digests through the MAC so the comparison is
    /// constant time.
    fn password_matches(&self, record: &UserRecord, password: &str) -> AuthResult<bool> {
        let (Some(salt), Some(stored)) =
            (hex_decode(&record.salt), hex_decode(&record.password_hash))
        else {
            return Ok(false);
        };
        let expected = self.sign(&stored)?;
        let mut mac = self.mac()?;
        mac.update(&hash_password(&salt, password));
        Ok(mac.verify_slice(&expected).is_ok())
    }

    fn save(&self, document: &UserDocument) -> AuthResult<()> {
        self.backend
            .write(USERS_DOCUMENT, &serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Crypto(e.to_string()))
    }

    fn sign(&self, data: &[u8]) -> AuthResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl IdentityVerifier for Authenticator {
    fn verify(&self, credential: &str) -> Result<Principal, IdentityFailure> {
        self.verify_token(credential).map_err(|e| match e {
            AuthError::TokenExpired => IdentityFailure::Expired,
            _ => IdentityFailure::Invalid,
        })
    }
}

fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn unix_millis(time: SystemTime) -> u64 {
    let millis = time.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Encodes bytes as a lowercase hexadecimal string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decodes a hexadecimal string, rejecting odd lengths and non-hex digits.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tabula_storage::InMemoryBackend;

    fn authenticator() -> Authenticator {
        Authenticator::open(Arc::new(InMemoryBackend::new()), AuthConfig::default()).unwrap()
    }

    #[test]
    fn register_and_authenticate() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();

        let token = auth.authenticate("alice", "pw").unwrap();
        assert!(token.starts_with("alice."));
        assert_eq!(auth.verify_token(&token).unwrap(), Principal::new("alice"));
    }

    #[test]
    fn password_check_compares_stored_digest() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();
        let record = auth.document.read().users["alice"].clone();

        assert!(auth.password_matches(&record, "pw").unwrap());
        assert!(!auth.password_matches(&record, "pw ").unwrap());
        assert!(!auth.password_matches(&record, "").unwrap());

        let mut flipped = record.clone();
        let last = if flipped.password_hash.ends_with('0') { "1" } else { "0" };
        flipped.password_hash.pop();
        flipped.password_hash.push_str(last);
        assert!(!auth.password_matches(&flipped, "pw").unwrap());

        let garbled = UserRecord {
            password_hash: "not hex".into(),
            ..record
        };
        assert!(!auth.password_matches(&garbled, "pw").unwrap());
    }

    #[test]
    fn duplicate_user_rejected() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();
        let err = auth.register_user("alice", "other").unwrap_err();
        assert!(matches!(err, AuthError::UserExists(_)));
        assert_eq!(auth.user_count(), 1);
    }

    #[test]
    fn wrong_password_or_user() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();
        assert!(matches!(
            auth.authenticate("alice", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("bob", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn expired_token_is_distinguished() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();

        let issued = SystemTime::now();
        let token = auth.issue_token_at("alice", issued).unwrap();
        let later = issued + Duration::from_secs(2 * 60 * 60);

        assert!(matches!(
            auth.verify_token_at(&token, later),
            Err(AuthError::TokenExpired)
        ));
        assert_eq!(auth.verify(&token).map(|p| p.to_string()), Ok("alice".into()));
        assert_eq!(
            auth.verify(&auth.issue_token_at("alice", UNIX_EPOCH).unwrap()),
            Err(IdentityFailure::Expired)
        );
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let auth = authenticator();
        auth.register_user("alice", "pw").unwrap();
        auth.register_user("mallory", "pw").unwrap();
        let token = auth.authenticate("alice", "pw").unwrap();

        let forged = token.replacen("alice", "mallory", 1);
        assert!(matches!(auth.verify_token(&forged), Err(AuthError::InvalidToken)));

        for garbage in ["", "alice", "alice.123", "alice.123.zz", "a.b.c.d"] {
            assert!(matches!(
                auth.verify_token(garbage),
                Err(AuthError::InvalidToken)
            ));
        }
    }

    #[test]
    fn tokens_from_other_secret_are_invalid() {
        let ours = authenticator();
        let theirs = authenticator();
        ours.register_user("alice", "pw").unwrap();
        theirs.register_user("alice", "pw").unwrap();

        let token = theirs.authenticate("alice", "pw").unwrap();
        assert_eq!(ours.verify(&token), Err(IdentityFailure::Invalid));
    }

    #[test]
    fn dotted_usernames_round_trip() {
        let auth = authenticator();
        auth.register_user("first.last", "pw").unwrap();
        let token = auth.authenticate("first.last", "pw").unwrap();
        assert_eq!(auth.verify_token(&token).unwrap().as_str(), "first.last");
    }

    #[test]
    fn users_and_secret_persist() {
        let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
        let token = {
            let auth = Authenticator::open(Arc::clone(&backend), AuthConfig::default()).unwrap();
            auth.register_user("alice", "pw").unwrap();
            auth.authenticate("alice", "pw").unwrap()
        };

        let auth = Authenticator::open(backend, AuthConfig::default()).unwrap();
        assert_eq!(auth.user_count(), 1);
        assert!(auth.verify_token(&token).is_ok());
        assert!(auth.authenticate("alice", "pw").is_ok());
    }

    #[test]
    fn invalid_input() {
        let auth = authenticator();
        assert!(matches!(
            auth.register_user("", "pw"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.register_user("bob", ""),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0x10]), "00ab10");
        assert_eq!(hex_decode("00ab10"), Some(vec![0x00, 0xab, 0x10]));
        assert_eq!(hex_decode("abc"), None);
        assert_eq!(hex_decode("zz"), None);
    }
}
