//! # Key Management
//!
//! RSA key-pair generation and transport encoding.
//!
//! ## Key Formats
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY FORMATS                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Public Key                                                     │   │
//! │  │  ──────────                                                      │   │
//! │  │                                                                 │   │
//! │  │  RsaPublicKey ──► SPKI DER ──► base64 ──► transport string     │   │
//! │  │                                                                 │   │
//! │  │  Shared freely; stored in the clear in the key directory.      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Private Key                                                    │   │
//! │  │  ───────────                                                     │   │
//! │  │                                                                 │   │
//! │  │  RsaPrivateKey ──► PKCS#8 DER ──► base64 ──► transport string  │   │
//! │  │                                                                 │   │
//! │  │  Crosses the encode boundary only on its way into the vault;   │   │
//! │  │  never persisted or logged in decoded form.                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// RSA modulus size in bits (2048-bit, ~112-bit symmetric-equivalent strength)
pub const MODULUS_BITS: usize = 2048;

/// Length of a displayed key fingerprint in hex characters
const FINGERPRINT_LEN: usize = 16;

/// An RSA key pair for message encryption
///
/// ## Security
///
/// - The private half is zeroized when this struct is dropped (handled by
///   the backing `rsa` crate)
/// - Generation is atomic: the two halves are never produced separately
/// - The public half can be safely shared with anyone
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    ///
    /// Uses the operating system's secure random number generator. This is
    /// CPU-bound work (prime search) and should be treated as blocking.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::KeyGeneration`] if the backend or entropy source
    /// fails. Generation is not retried automatically.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, MODULUS_BITS)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Get the public half
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Get the private half
    ///
    /// ## Security Warning
    ///
    /// Only use this to decrypt or to feed the vault. Never log or persist
    /// the decoded key.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

/// Encode a public key as an SPKI DER, base64 transport string
pub fn encode_public_key(key: &RsaPublicKey) -> Result<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| Error::KeyDecode(format!("SPKI encoding failed: {}", e)))?;
    Ok(BASE64.encode(der.as_bytes()))
}

/// Decode a public key from its transport string
///
/// ## Errors
///
/// Returns [`Error::KeyDecode`] for any ill-formed input; never silently
/// returns a usable-but-wrong key.
pub fn decode_public_key(encoded: &str) -> Result<RsaPublicKey> {
    let der = BASE64
        .decode(encoded)
        .map_err(|e| Error::KeyDecode(format!("Invalid base64: {}", e)))?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| Error::KeyDecode(format!("Invalid SPKI public key: {}", e)))
}

/// Encode a private key as a PKCS#8 DER, base64 transport string
///
/// The returned string is zeroized on drop. The intermediate DER document
/// zeroizes itself.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<Zeroizing<String>> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| Error::KeyDecode(format!("PKCS#8 encoding failed: {}", e)))?;
    Ok(Zeroizing::new(BASE64.encode(der.as_bytes())))
}

/// Decode a private key from its transport string
///
/// ## Errors
///
/// Returns [`Error::KeyDecode`] for any ill-formed input.
pub fn decode_private_key(encoded: &str) -> Result<RsaPrivateKey> {
    let der = Zeroizing::new(
        BASE64
            .decode(encoded)
            .map_err(|e| Error::KeyDecode(format!("Invalid base64: {}", e)))?,
    );
    RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| Error::KeyDecode(format!("Invalid PKCS#8 private key: {}", e)))
}

/// Check whether a string is structurally well-formed key material
///
/// This is a structural check ONLY: it answers "does this decode as the
/// transport encoding", nothing more. It accepts any base64 string,
/// including one that is not actually a valid key for the cipher. It is a
/// cheap guard for sequencing bugs (loading garbage into a session), NOT a
/// cryptographic validity check.
pub fn is_valid_key(value: &str) -> bool {
    !value.is_empty() && BASE64.decode(value).is_ok()
}

/// Compute a short fingerprint of an encoded key for out-of-band display
///
/// SHA-256 over the transport string, hex, truncated. Collision resistance
/// at this length is adequate for a human comparison aid, not for machine
/// identity.
pub fn fingerprint(encoded_key: &str) -> String {
    let digest = Sha256::digest(encoded_key.as_bytes());
    hex::encode(digest)[..FINGERPRINT_LEN].to_string()
}

/// Verify an encoded key against an expected fingerprint
pub fn verify_fingerprint(encoded_key: &str, expected: &str) -> bool {
    fingerprint(encoded_key) == expected
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation_distinct() {
        let kp1 = KeyPair::generate().unwrap();
        let kp2 = KeyPair::generate().unwrap();

        let pub1 = encode_public_key(kp1.public_key()).unwrap();
        let pub2 = encode_public_key(kp2.public_key()).unwrap();
        assert_ne!(pub1, pub2);
    }

    #[test]
    fn test_public_key_round_trip() {
        let kp = KeyPair::generate().unwrap();

        let encoded = encode_public_key(kp.public_key()).unwrap();
        let decoded = decode_public_key(&encoded).unwrap();

        assert_eq!(&decoded, kp.public_key());
    }

    #[test]
    fn test_private_key_round_trip() {
        let kp = KeyPair::generate().unwrap();

        let encoded = encode_private_key(kp.private_key()).unwrap();
        let decoded = decode_private_key(&encoded).unwrap();

        assert_eq!(&decoded, kp.private_key());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_public_key("not base64 at all!!"),
            Err(Error::KeyDecode(_))
        ));
        assert!(matches!(
            decode_private_key("not base64 at all!!"),
            Err(Error::KeyDecode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_valid_base64_invalid_der() {
        // Decodes as base64 but is not a DER-encoded key.
        let encoded = BASE64.encode(b"definitely not a key");
        assert!(matches!(
            decode_public_key(&encoded),
            Err(Error::KeyDecode(_))
        ));
        assert!(matches!(
            decode_private_key(&encoded),
            Err(Error::KeyDecode(_))
        ));
    }

    #[test]
    fn test_is_valid_key_is_structural_only() {
        let kp = KeyPair::generate().unwrap();
        let encoded = encode_public_key(kp.public_key()).unwrap();

        assert!(is_valid_key(&encoded));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("not base64 at all!!"));

        // Structurally decodable but not a key: still accepted.
        assert!(is_valid_key(&BASE64.encode(b"definitely not a key")));
    }

    #[test]
    fn test_fingerprint_stable_and_verifiable() {
        let kp = KeyPair::generate().unwrap();
        let encoded = encode_public_key(kp.public_key()).unwrap();

        let fp = fingerprint(&encoded);
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, fingerprint(&encoded));
        assert!(verify_fingerprint(&encoded, &fp));
        assert!(!verify_fingerprint(&encoded, "0000000000000000"));
    }
}
