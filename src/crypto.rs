//! Password hashing and session-token primitives.

use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use password_hash::{PasswordHash, PasswordHasher as ArgonPasswordHasher, SaltString};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::AuthError;

/// Length of session tokens issued at login.
pub const SESSION_TOKEN_LENGTH: usize = 50;

/// One-way password hashing with an internally generated salt.
///
/// Implementations must embed the salt and parameters in the returned string
/// so that [`verify`](Self::verify) needs nothing but the plaintext and the
/// stored hash.
///
/// ```rust
/// use gatehouse::crypto::{Argon2Hasher, PasswordHasher};
///
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash("p1").unwrap();
/// assert!(hasher.verify("p1", &hash).unwrap());
/// assert!(!hasher.verify("p2", &hash).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if `hash` is malformed. A
    /// well-formed hash that does not match yields `Ok(false)`.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// Memory cost in KiB
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// 64 MiB, 3 iterations, 4 lanes.
    #[must_use]
    pub fn production() -> Self {
        Self::new(65536, 3, 4)
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| AuthError::PasswordHashError)?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| AuthError::PasswordHashError)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHashError)?;

        // parameters come from the PHC string, not from self
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Random alphanumeric token drawn from the thread-local CSPRNG.
///
/// ```rust
/// use gatehouse::crypto::generate_token;
///
/// assert_eq!(generate_token(50).len(), 50);
/// ```
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// SHA-256 digest of a session token, hex encoded. Stores persist this
/// instead of the bearer value; tokens are high-entropy so a fast hash is
/// enough.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
