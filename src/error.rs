//! # Error Handling
//!
//! Error types for the encryption core.
//!
//! ## Error Taxonomy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR TAXONOMY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Material                                                      │
//! │  │   ├── KeyGeneration   - Entropy/backend failure during generation   │
//! │  │   └── KeyDecode       - Malformed transport encoding                │
//! │  │                                                                      │
//! │  ├── Message Encryption                                                │
//! │  │   └── Encryption      - Oversize plaintext or backend failure       │
//! │  │                                                                      │
//! │  ├── Key Vault                                                         │
//! │  │   └── InvalidPasswordOrCorruptBlob                                  │
//! │  │                        - Wrong password OR corrupted blob;          │
//! │  │                          deliberately indistinguishable             │
//! │  │                                                                      │
//! │  ├── Session                                                           │
//! │  │   └── KeysNotLoaded   - Keys accessed before login completed        │
//! │  │                                                                      │
//! │  └── Key Directory                                                     │
//! │      └── KeyRecordExists - One-time key issuance would be overwritten  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Message decryption is deliberately absent from this taxonomy: it is the
//! one operation with a local, non-propagating failure policy. See
//! [`crate::crypto::DecryptOutcome`].

use thiserror::Error;

/// Result type alias for encryption-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the encryption core
///
/// All errors are categorized by subsystem to make error handling clearer
/// and to provide meaningful messages to callers.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Material Errors
    // ========================================================================

    /// Key pair generation failed (entropy or backend failure)
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A transport-encoded key could not be decoded
    ///
    /// Callers should treat the source record as corrupt.
    #[error("Malformed key encoding: {0}")]
    KeyDecode(String),

    // ========================================================================
    // Message Encryption Errors
    // ========================================================================

    /// Message encryption failed (oversize plaintext or backend failure)
    ///
    /// Surfaced to the caller so the send can be aborted.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    // ========================================================================
    // Key Vault Errors
    // ========================================================================

    /// The protected private-key blob could not be opened
    ///
    /// Authenticated encryption cannot distinguish a wrong password from a
    /// corrupted blob; callers must present this ambiguity to the user
    /// rather than claim certainty either way.
    #[error("Could not unlock private key: wrong password or corrupted key record")]
    InvalidPasswordOrCorruptBlob,

    // ========================================================================
    // Session Errors
    // ========================================================================

    /// Session keys were accessed before login completed
    ///
    /// A sequencing bug in the caller, not a user-facing condition.
    #[error("Session keys not loaded. Complete login before accessing keys.")]
    KeysNotLoaded,

    // ========================================================================
    // Key Directory Errors
    // ========================================================================

    /// A key record already exists for this identity
    ///
    /// Key issuance is a one-time event absent an explicit rotation feature,
    /// so an existing record is never silently overwritten.
    #[error("A key record already exists for user {0}")]
    KeyRecordExists(String),
}

impl Error {
    /// Check if this error is recoverable by user action
    ///
    /// The only recovery path in this core is re-prompting for the password;
    /// no operation is retried internally.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, Error::InvalidPasswordOrCorruptBlob)
    }

    /// Check if this error is a precondition violation
    ///
    /// Precondition violations indicate a bug in calling code (keys accessed
    /// before login) and should not be shown to users as ordinary errors.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Error::KeysNotLoaded)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_recoverable_errors() {
        assert!(Error::InvalidPasswordOrCorruptBlob.is_user_recoverable());
        assert!(!Error::KeysNotLoaded.is_user_recoverable());
        assert!(!Error::KeyGeneration("rng".into()).is_user_recoverable());
    }

    #[test]
    fn test_precondition_violations() {
        assert!(Error::KeysNotLoaded.is_precondition_violation());
        assert!(!Error::InvalidPasswordOrCorruptBlob.is_precondition_violation());
    }

    #[test]
    fn test_vault_error_does_not_name_a_cause() {
        // The message must stay ambiguous between wrong password and
        // corruption; asserting on it catches accidental over-specificity.
        let message = Error::InvalidPasswordOrCorruptBlob.to_string();
        assert!(message.contains("wrong password"));
        assert!(message.contains("corrupt"));
    }
}
