//! # Message Cipher
//!
//! Per-message RSA-OAEP encryption and decryption.
//!
//! ## Failure Policy
//!
//! The two directions have deliberately different failure policies:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       FAILURE POLICY                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  encrypt ──► Result<String>                                             │
//! │    Rare, actionable event (a send). Oversize plaintext or backend      │
//! │    failure propagates as EncryptionError so the caller can abort.      │
//! │                                                                         │
//! │  decrypt ──► DecryptOutcome (total, never fails)                        │
//! │    High-frequency, per-message render path. Wrong key, corrupted       │
//! │    ciphertext, or legacy plaintext input all collapse into the         │
//! │    Undecryptable marker: one bad message must not take down the        │
//! │    rendering of a whole conversation.                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Size Limitation
//!
//! Plaintext is encrypted directly under RSA-OAEP, so message size is
//! bounded by the modulus: 190 bytes at 2048 bits with SHA-256. There is no
//! hybrid (symmetric session key) scheme; longer messages are a known
//! limitation of the wire format.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{Error, Result};

/// OAEP padding overhead in bytes: 2 × SHA-256 digest + 2 (RFC 8017 §7.1.1)
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// Maximum plaintext size in bytes for the standard 2048-bit modulus
pub const MAX_PLAINTEXT_SIZE: usize = 2048 / 8 - OAEP_OVERHEAD;

/// Placeholder shown in place of content that could not be decrypted
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[Unable to decrypt message]";

/// Maximum plaintext size in bytes for a specific recipient key
pub fn max_plaintext_size(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(OAEP_OVERHEAD)
}

/// The outcome of a decryption attempt
///
/// Decryption is a total function: it yields either the plaintext or an
/// explicit "could not decrypt" marker, never an error. A mixed history of
/// legacy plaintext and ciphertext messages therefore degrades gracefully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Decryption succeeded; the recovered message text
    Plaintext(String),
    /// Decryption was not possible (wrong key, corrupted ciphertext, or
    /// input that was never ciphertext)
    Undecryptable,
}

impl DecryptOutcome {
    /// Get the plaintext if decryption succeeded
    pub fn as_plaintext(&self) -> Option<&str> {
        match self {
            Self::Plaintext(text) => Some(text),
            Self::Undecryptable => None,
        }
    }

    /// Check if this outcome is the non-decryptable marker
    pub fn is_undecryptable(&self) -> bool {
        matches!(self, Self::Undecryptable)
    }

    /// Convert into display text, substituting the fixed placeholder for
    /// content that could not be decrypted
    pub fn into_display(self) -> String {
        match self {
            Self::Plaintext(text) => text,
            Self::Undecryptable => UNDECRYPTABLE_PLACEHOLDER.to_string(),
        }
    }
}

/// Encrypt a message for a recipient
///
/// Encodes the plaintext as UTF-8 and encrypts it under the recipient's
/// public key with OAEP/SHA-256 padding. Returns the base64 transport form
/// of the ciphertext, which is stored as the durable message body.
///
/// ## Errors
///
/// Returns [`Error::Encryption`] when the plaintext exceeds the key's
/// maximum payload size or the backend fails. Callers decide whether to
/// propagate or block the send; nothing is truncated silently.
pub fn encrypt(plaintext: &str, recipient: &RsaPublicKey) -> Result<String> {
    let bytes = plaintext.as_bytes();
    let limit = max_plaintext_size(recipient);
    if bytes.len() > limit {
        return Err(Error::Encryption(format!(
            "plaintext is {} bytes but the recipient key fits at most {}",
            bytes.len(),
            limit
        )));
    }

    let ciphertext = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), bytes)
        .map_err(|e| Error::Encryption(e.to_string()))?;

    Ok(BASE64.encode(ciphertext))
}

/// Decrypt a message with the session's private key
///
/// Total function: any failure (malformed transport encoding, wrong key,
/// corrupted ciphertext, non-UTF-8 plaintext) yields
/// [`DecryptOutcome::Undecryptable`] rather than an error. See the module
/// docs for why.
pub fn decrypt(ciphertext: &str, private_key: &RsaPrivateKey) -> DecryptOutcome {
    let raw = match BASE64.decode(ciphertext) {
        Ok(raw) => raw,
        Err(_) => return DecryptOutcome::Undecryptable,
    };

    let plaintext = match private_key.decrypt(Oaep::new::<Sha256>(), &raw) {
        Ok(plaintext) => plaintext,
        Err(_) => return DecryptOutcome::Undecryptable,
    };

    match String::from_utf8(plaintext) {
        Ok(text) => DecryptOutcome::Plaintext(text),
        Err(_) => DecryptOutcome::Undecryptable,
    }
}

// ============================================================================
// TESTS
// ============================================================================
