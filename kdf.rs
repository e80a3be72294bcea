//! Password-based key derivation and randomness.
//!
//! Keys are derived with PBKDF2-HMAC-SHA256 and returned in a [`Zeroizing`]
//! wrapper so they are wiped when dropped. Salts and nonces come from an
//! injected [`EntropySource`]; production code uses [`OsEntropy`], tests can
//! substitute [`FixedEntropy`] for reproducible blobs.

use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

/// PBKDF2 iteration count shared by every blob this crate writes
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Source of salts and nonces.
pub trait EntropySource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Deterministic entropy: every byte is `seed`, `seed + 1`, `seed + 2`, ...
///
/// Not random. Only for reproducible tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy {
    pub seed: u8,
}

impl FixedEntropy {
    pub fn new(seed: u8) -> Self {
        Self { seed }
    }
}

impl EntropySource for FixedEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) {
        for (i, byte) in dest.iter_mut().enumerate() {
            *byte = self.seed.wrapping_add(i as u8);
        }
    }
}

/// Generates a fresh salt from `entropy`.
pub fn generate_salt(entropy: &dyn EntropySource) -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    entropy.fill_bytes(&mut salt);
    salt
}

/// Derives a 256-bit key from `password` and `salt`.
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut *key);
    key
}
