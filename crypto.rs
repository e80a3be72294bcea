//! Password-based authenticated encryption.
//!
//! This module provides [`PasswordCipher`], which derives an AES-256 key from a
//! password with PBKDF2-HMAC-SHA256 and seals the payload with AES-256-GCM.
//!
//! ## Blob Format
//!
//! ```text
//! [salt:16][nonce:12 or 16][ciphertext][tag:16]
//! ```
//!
//! The nonce length is not stored in the blob. It is fixed by the configured
//! [`CipherVariant`] and must match between encryption and decryption.

use crate::error::StegoError;
use crate::kdf::{self, EntropySource, OsEntropy, DEFAULT_ITERATIONS, SALT_LEN};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// AES-256-GCM with the 16-byte nonce used by legacy blobs
type Aes256GcmLegacy = AesGcm<Aes256, U16>;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// Nonce layout of an encrypted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherVariant {
    /// 12-byte nonce, the GCM standard size
    #[default]
    Standard,
    /// 16-byte nonce written by older releases
    Legacy,
}

impl CipherVariant {
    pub fn nonce_len(self) -> usize {
        match self {
            Self::Standard => 12,
            Self::Legacy => 16,
        }
    }

    /// Smallest blob that can hold salt and nonce
    pub fn header_len(self) -> usize {
        SALT_LEN + self.nonce_len()
    }
}

impl fmt::Display for CipherVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for CipherVariant {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "legacy" => Ok(Self::Legacy),
            other => Err(StegoError::config(format!("unknown cipher variant: {}", other))),
        }
    }
}

/// Encrypts and decrypts byte payloads under a password.
#[derive(Clone)]
pub struct PasswordCipher {
    variant: CipherVariant,
    iterations: u32,
    entropy: Arc<dyn EntropySource>,
}

impl fmt::Debug for PasswordCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCipher")
            .field("variant", &self.variant)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Default for PasswordCipher {
    fn default() -> Self {
        Self::new(CipherVariant::Standard)
    }
}

impl PasswordCipher {
    pub fn new(variant: CipherVariant) -> Self {
        Self {
            variant,
            iterations: DEFAULT_ITERATIONS,
            entropy: Arc::new(OsEntropy),
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn variant(&self) -> CipherVariant {
        self.variant
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypts `data`, returning `salt || nonce || ciphertext+tag`.
    ///
    /// Key derivation runs on the blocking thread pool.
    pub async fn encrypt(&self, data: &[u8], password: &str) -> Result<Vec<u8>, StegoError> {
        let salt = kdf::generate_salt(self.entropy.as_ref());
        let mut nonce = vec![0u8; self.variant.nonce_len()];
        self.entropy.fill_bytes(&mut nonce);

        let variant = self.variant;
        let iterations = self.iterations;
        let data = data.to_vec();
        let password = Zeroizing::new(password.to_owned());

        tokio::task::spawn_blocking(move || {
            seal(variant, iterations, &salt, &nonce, &data, &password)
        })
        .await
        .map_err(task_failed)?
    }

    /// Decrypts a blob produced by [`encrypt`](Self::encrypt) with the same variant.
    pub async fn decrypt(&self, blob: &[u8], password: &str) -> Result<Vec<u8>, StegoError> {
        if blob.len() < self.variant.header_len() {
            debug!(len = blob.len(), variant = %self.variant, "blob shorter than salt and nonce");
            return Err(StegoError::Authentication);
        }

        let variant = self.variant;
        let iterations = self.iterations;
        let blob = blob.to_vec();
        let password = Zeroizing::new(password.to_owned());

        tokio::task::spawn_blocking(move || open(variant, iterations, &blob, &password))
            .await
            .map_err(task_failed)?
    }

    /// Encrypts UTF-8 text and encodes the blob as standard Base64.
    pub async fn encrypt_text(&self, text: &str, password: &str) -> Result<String, StegoError> {
        let blob = self.encrypt(text.as_bytes(), password).await?;
        Ok(BASE64.encode(blob))
    }

    /// Reverses [`encrypt_text`](Self::encrypt_text).
    pub async fn decrypt_text(&self, encoded: &str, password: &str) -> Result<String, StegoError> {
        let blob = BASE64
            .decode(encoded.trim())
            .map_err(|e| StegoError::format(format!("invalid base64: {}", e)))?;
        let plaintext = self.decrypt(&blob, password).await?;
        String::from_utf8(plaintext)
            .map_err(|_| StegoError::format("decrypted text is not valid UTF-8"))
    }
}

/// A panicked or cancelled crypto task is a provider failure, never a bad password
fn task_failed(e: tokio::task::JoinError) -> StegoError {
    StegoError::encryption(format!("crypto task failed: {}", e))
}

fn seal(
    variant: CipherVariant,
    iterations: u32,
    salt: &[u8; SALT_LEN],
    nonce: &[u8],
    data: &[u8],
    password: &str,
) -> Result<Vec<u8>, StegoError> {
    let key = kdf::derive_key(password, salt, iterations);
    let ciphertext = match variant {
        CipherVariant::Standard => seal_with::<Aes256Gcm>(&key[..], nonce, data)?,
        CipherVariant::Legacy => seal_with::<Aes256GcmLegacy>(&key[..], nonce, data)?,
    };

    let mut out = Vec::with_capacity(SALT_LEN + nonce.len() + ciphertext.len());
    out.extend_from_slice(salt);
    out.extend_from_slice(nonce);
    out.extend_from_slice(&ciphertext);
    debug!(plaintext = data.len(), blob = out.len(), variant = %variant, "payload sealed");
    Ok(out)
}

fn open(
    variant: CipherVariant,
    iterations: u32,
    blob: &[u8],
    password: &str,
) -> Result<Vec<u8>, StegoError> {
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(variant.nonce_len());

    let key = kdf::derive_key(password, salt, iterations);
    match variant {
        CipherVariant::Standard => open_with::<Aes256Gcm>(&key[..], nonce, ciphertext),
        CipherVariant::Legacy => open_with::<Aes256GcmLegacy>(&key[..], nonce, ciphertext),
    }
}

fn seal_with<C: Aead + KeyInit>(key: &[u8], nonce: &[u8], data: &[u8]) -> Result<Vec<u8>, StegoError> {
    let cipher = C::new_from_slice(key).map_err(|e| StegoError::encryption(e.to_string()))?;
    cipher
        .encrypt(GenericArray::from_slice(nonce), data)
        .map_err(|e| StegoError::encryption(e.to_string()))
}

fn open_with<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, StegoError> {
    let cipher = C::new_from_slice(key).map_err(|_| StegoError::Authentication)?;
    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| StegoError::Authentication)
}
