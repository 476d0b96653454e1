//! AES-256-GCM encryption for stored tokens.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::TokenStorage;
use crate::{SecretString, TokenStorageError};

type HmacSha256 = Hmac<Sha256>;

const MIN_KEY_LENGTH: usize = 32;
const NONCE_SIZE: usize = 12;
const SEALED_PREFIX: &str = "aes256:";
const KEY_CONTEXT: &[u8] = b"gatehouse.token-storage.v1";

/// Encrypts every value written to the inner storage with AES-256-GCM.
///
/// Values are written as `aes256:{base64(nonce || ciphertext)}` with a fresh
/// random nonce per write. The cipher key is derived from the protection
/// secret with HMAC-SHA256, and the storage key is bound in as associated
/// data.
///
/// A value encrypted under a different (for example, rotated) secret, a
/// value moved to another storage key, or a tampered value fails with
/// [`TokenStorageError::Unprotect`].
pub struct ProtectedTokenStorage<T: TokenStorage> {
    inner: T,
    cipher: Aes256Gcm,
}

impl<T: TokenStorage> ProtectedTokenStorage<T> {
    /// # Errors
    ///
    /// `TokenStorageError::InvalidKey` if `secret` is shorter than 32 bytes.
    pub fn new(inner: T, secret: SecretString) -> Result<Self, TokenStorageError> {
        if secret.len() < MIN_KEY_LENGTH {
            return Err(TokenStorageError::InvalidKey(format!(
                "protection key must be at least {MIN_KEY_LENGTH} bytes"
            )));
        }

        let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| TokenStorageError::InvalidKey(e.to_string()))?;
        mac.update(KEY_CONTEXT);
        let key = mac.finalize().into_bytes();
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TokenStorageError::InvalidKey(e.to_string()))?;

        Ok(Self { inner, cipher })
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn seal(&self, key: &str, value: &str) -> Result<String, TokenStorageError> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: value.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| TokenStorageError::Protect)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(format!("{SEALED_PREFIX}{}", STANDARD.encode(sealed)))
    }

    fn unseal(&self, key: &str, sealed: &str) -> Result<String, TokenStorageError> {
        let encoded = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or(TokenStorageError::Unprotect)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| TokenStorageError::Unprotect)?;
        if bytes.len() < NONCE_SIZE {
            return Err(TokenStorageError::Unprotect);
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| TokenStorageError::Unprotect)?;

        String::from_utf8(plaintext).map_err(|_| TokenStorageError::Unprotect)
    }
}

#[async_trait]
impl<T: TokenStorage> TokenStorage for ProtectedTokenStorage<T> {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStorageError> {
        let Some(sealed) = self.inner.get(key).await? else {
            return Ok(None);
        };

        match self.unseal(key, sealed.expose_secret()) {
            Ok(value) => Ok(Some(SecretString::new(value))),
            Err(e) => {
                log::warn!(
                    target: "gatehouse::storage",
                    "msg=\"stored value failed to decrypt\" key=\"{key}\""
                );
                Err(e)
            }
        }
    }

    async fn set(&self, key: &str, value: &SecretString) -> Result<(), TokenStorageError> {
        let sealed = self.seal(key, value.expose_secret())?;
        self.inner.set(key, &SecretString::new(sealed)).await
    }

    async fn delete(&self, key: &str) -> Result<(), TokenStorageError> {
        self.inner.delete(key).await
    }
}
