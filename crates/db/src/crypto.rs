//! AES-256-GCM encryption for webhook secrets stored in Postgres.
//!
//! Stored form: base64 of `nonce (12 bytes) || ciphertext`.  A fresh random
//! nonce is drawn for every encryption.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

use crate::DbError;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Parse a 32-byte key given as 64 hex characters or as base64.
    pub fn from_key_str(key: &str) -> Result<Self, DbError> {
        let key = key.trim();
        let bytes = hex::decode(key)
            .ok()
            .filter(|b| b.len() == KEY_SIZE)
            .or_else(|| BASE64.decode(key).ok())
            .ok_or_else(|| DbError::Crypto("key is neither hex nor base64".into()))?;
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| DbError::Crypto(format!("key must be {KEY_SIZE} bytes")))?;
        Ok(Self::new(&key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, DbError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| DbError::Crypto("encryption failed".into()))?;

        let mut stored = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(stored))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, DbError> {
        let bytes = BASE64
            .decode(stored)
            .map_err(|_| DbError::Crypto("stored secret is not base64".into()))?;
        if bytes.len() <= NONCE_SIZE {
            return Err(DbError::Crypto("stored secret is truncated".into()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DbError::Crypto("decryption failed (wrong key?)".into()))?;
        String::from_utf8(plaintext).map_err(|_| DbError::Crypto("secret is not UTF-8".into()))
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCipher(***)")
    }
}
