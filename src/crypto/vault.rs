//! # Private Key Vault
//!
//! Password-based protection of a private key for at-rest storage.
//!
//! ## Protection Scheme
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PROTECT / OPEN FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  protect(private_key, password)                                        │
//! │  ──────────────────────────────                                         │
//! │                                                                         │
//! │  1. salt  = 16 random bytes            (fresh per call)               │
//! │  2. nonce = 12 random bytes            (fresh per call)               │
//! │  3. key   = PBKDF2-HMAC-SHA256(password, salt, 100_000 rounds)        │
//! │  4. ciphertext = AES-256-GCM(key, nonce, private_key_bytes)           │
//! │                                                                         │
//! │  Output: ProtectedPrivateKeyBlob { salt, nonce, ciphertext }           │
//! │                                                                         │
//! │  open(blob, password)                                                  │
//! │  ────────────────────                                                   │
//! │                                                                         │
//! │  1. key = PBKDF2-HMAC-SHA256(password, blob.salt, 100_000 rounds)     │
//! │  2. AES-256-GCM-decrypt(key, blob.nonce, blob.ciphertext)             │
//! │     → private key, or authentication-tag mismatch                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The One Error
//!
//! `open` has a single failure signal: [`Error::InvalidPasswordOrCorruptBlob`].
//! An authenticated cipher cannot distinguish "wrong password" from
//! "corrupted data": the tag mismatches either way. Callers must present
//! that ambiguity to the user; the only recovery path is a caller-level
//! password re-prompt.
//!
//! ## Critical Security Requirement
//!
//! **Salt and nonce are drawn fresh on every `protect` call**, even for the
//! same key and password. Reusing a (key, nonce) pair breaks AES-GCM
//! entirely.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// PBKDF2 iteration count (deliberately slow, ~100k rounds)
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Size of the per-record random salt in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the derived AES key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// A private key protected for at-rest storage
///
/// Self-describing envelope carrying everything `open` needs besides the
/// password. Serializes to JSON with base64 binary fields, suitable for a
/// text column in the key directory's backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPrivateKeyBlob {
    /// Per-record PBKDF2 salt (fresh per `protect` call)
    #[serde(with = "base64_array")]
    pub salt: [u8; SALT_SIZE],
    /// Per-record AES-GCM nonce (fresh per `protect` call)
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_SIZE],
    /// AES-256-GCM ciphertext of the private key, auth tag included
    #[serde(with = "base64_vec")]
    pub ciphertext: Vec<u8>,
}

impl ProtectedPrivateKeyBlob {
    /// Serialize to the JSON envelope form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Encryption(format!("blob serialization failed: {}", e)))
    }

    /// Parse a blob from its JSON envelope form
    ///
    /// A blob that does not parse is indistinguishable from any other
    /// corruption, so this fails with
    /// [`Error::InvalidPasswordOrCorruptBlob`] like `open` itself.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|_| Error::InvalidPasswordOrCorruptBlob)
    }
}

/// Protect a private key with a password
///
/// Takes the private key in its transport-encoded form; the decoded key
/// never touches this module.
///
/// ## Parameters
///
/// - `private_key`: transport-encoded private key to protect
/// - `password`: the user's password; never stored, never logged
pub fn protect(private_key: &str, password: &str) -> Result<ProtectedPrivateKeyBlob> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| Error::Encryption(format!("vault cipher init failed: {}", e)))?;

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce), private_key.as_bytes())
        .map_err(|e| Error::Encryption(format!("vault encryption failed: {}", e)))?;

    Ok(ProtectedPrivateKeyBlob {
        salt,
        nonce,
        ciphertext,
    })
}

/// Open a protected blob, recovering the transport-encoded private key
///
/// ## Errors
///
/// [`Error::InvalidPasswordOrCorruptBlob`] on any failure. Wrong password
/// and corrupted blob are deliberately indistinguishable; see module docs.
pub fn open(blob: &ProtectedPrivateKeyBlob, password: &str) -> Result<Zeroizing<String>> {
    let key = derive_key(password, &blob.salt);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|_| Error::InvalidPasswordOrCorruptBlob)?;

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(AesNonce::from_slice(&blob.nonce), blob.ciphertext.as_slice())
            .map_err(|_| Error::InvalidPasswordOrCorruptBlob)?,
    );

    let text = std::str::from_utf8(&plaintext).map_err(|_| Error::InvalidPasswordOrCorruptBlob)?;
    Ok(Zeroizing::new(text.to_string()))
}

/// Derive the vault AES key from a password and salt
///
/// Deliberately slow: the iteration count is the brute-force brake.
fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, key.as_mut_slice());
    key
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Serde helper for fixed-size byte arrays as base64 strings
mod base64_array {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid length"))
    }
}

/// Serde helper for variable-size byte vectors as base64 strings
mod base64_vec {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================
