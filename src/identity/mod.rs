//! # Identity Key Flows
//!
//! Signup and login orchestration over the crypto primitives.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      IDENTITY KEY FLOWS                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  enroll (signup)                                                       │
//! │  ───────────────                                                        │
//! │  generate pair ──► encode halves ──► protect private with password    │
//! │                          │                      │                       │
//! │                          ▼                      ▼                       │
//! │                    public half            protected blob               │
//! │                          └────────┬─────────────┘                       │
//! │                                   ▼                                     │
//! │                        directory.put(record)    (once, ever)           │
//! │                                                                         │
//! │  unlock (login)                                                        │
//! │  ──────────────                                                         │
//! │  directory.get ──► none ──► LegacyUser (no keys, not an error)         │
//! │        │                                                                │
//! │        └── some ──► vault.open(blob, password) ──► cache.load          │
//! │                           │                                             │
//! │                           └── wrong password / corrupt ──► error,      │
//! │                               cache untouched (fail closed)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::crypto;
use crate::directory::{KeyDirectory, StoredKeyRecord};
use crate::error::Result;
use crate::session::SessionKeyCache;

/// The public outcome of enrolling an identity
///
/// Contains nothing secret: the private half went straight into the vault.
#[derive(Debug, Clone)]
pub struct EnrolledIdentity {
    /// The enrolled identity
    pub user_id: String,
    /// Transport-encoded public key, as stored in the directory
    pub public_key: String,
    /// Short fingerprint of the public key for out-of-band display
    pub fingerprint: String,
}

/// Generate and store keys for a new identity
///
/// One-time event per identity: a second enrollment fails with
/// [`crate::Error::KeyRecordExists`] rather than rotating keys.
///
/// Key generation and the password derivation inside `protect` are
/// CPU-bound; callers on a latency-sensitive path should off-load this
/// call.
pub fn enroll(
    directory: &dyn KeyDirectory,
    user_id: &str,
    password: &str,
) -> Result<EnrolledIdentity> {
    let pair = crypto::KeyPair::generate()?;
    let public_key = crypto::encode_public_key(pair.public_key())?;
    let private_key = crypto::encode_private_key(pair.private_key())?;

    let blob = crypto::protect(&private_key, password)?;
    directory.put(StoredKeyRecord::new(user_id, public_key.clone(), blob))?;
    tracing::info!("enrolled encryption keys for {}", user_id);

    Ok(EnrolledIdentity {
        user_id: user_id.to_string(),
        fingerprint: crypto::fingerprint(&public_key),
        public_key,
    })
}

/// The two successful outcomes of a login unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Keys were unlocked and loaded into the session cache
    Unlocked,
    /// The identity predates the encryption feature and has no key record;
    /// the session cache is left untouched
    LegacyUser,
}

/// Unlock an identity's keys at login and load them into the session
///
/// ## Errors
///
/// [`crate::Error::InvalidPasswordOrCorruptBlob`] when the blob does not
/// open, surfaced as a "check your password" condition, never auto-retried
/// here. The cache is untouched on every error path.
pub fn unlock(
    directory: &dyn KeyDirectory,
    cache: &SessionKeyCache,
    user_id: &str,
    password: &str,
) -> Result<UnlockOutcome> {
    let record = match directory.get(user_id) {
        Some(record) => record,
        None => {
            tracing::info!("no key record for {}; identity predates encryption", user_id);
            return Ok(UnlockOutcome::LegacyUser);
        }
    };

    let private_key = crypto::open(&record.encrypted_private_key, password)?;
    cache.load(user_id, &private_key, &record.public_key)?;

    Ok(UnlockOutcome::Unlocked)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryKeyDirectory;
    use crate::error::Error;

    #[test]
    fn test_signup_scenario() {
        let directory = InMemoryKeyDirectory::new();

        let enrolled = enroll(&directory, "alice", "correct-horse").unwrap();
        assert_eq!(enrolled.user_id, "alice");
        assert!(crypto::is_valid_key(&enrolled.public_key));
        assert!(crypto::verify_fingerprint(
            &enrolled.public_key,
            &enrolled.fingerprint
        ));

        // Retrieving and opening with the right password yields a private
        // key that decodes and matches the stored public half.
        let record = directory.get("alice").unwrap();
        assert_eq!(record.public_key, enrolled.public_key);

        let private_key = crypto::open(&record.encrypted_private_key, "correct-horse").unwrap();
        assert!(crypto::decode_private_key(&private_key).is_ok());

        // The wrong password fails closed.
        let result = crypto::open(&record.encrypted_private_key, "wrong-password");
        assert!(matches!(result, Err(Error::InvalidPasswordOrCorruptBlob)));
    }

    #[test]
    fn test_enroll_is_one_time() {
        let directory = InMemoryKeyDirectory::new();
        enroll(&directory, "alice", "correct-horse").unwrap();

        let result = enroll(&directory, "alice", "correct-horse");
        assert!(matches!(result, Err(Error::KeyRecordExists(_))));
    }

    #[test]
    fn test_unlock_round_trip() {
        let directory = InMemoryKeyDirectory::new();
        let cache = SessionKeyCache::new();

        let enrolled = enroll(&directory, "alice", "correct-horse").unwrap();
        let outcome = unlock(&directory, &cache, "alice", "correct-horse").unwrap();

        assert_eq!(outcome, UnlockOutcome::Unlocked);
        assert!(cache.is_ready());
        assert_eq!(cache.public_key().as_deref(), Some(enrolled.public_key.as_str()));
    }

    #[test]
    fn test_unlock_wrong_password_leaves_cache_empty() {
        let directory = InMemoryKeyDirectory::new();
        let cache = SessionKeyCache::new();
        enroll(&directory, "alice", "correct-horse").unwrap();

        let result = unlock(&directory, &cache, "alice", "wrong-password");

        assert!(matches!(result, Err(Error::InvalidPasswordOrCorruptBlob)));
        assert!(!cache.is_ready());
    }

    #[test]
    fn test_unlock_legacy_user_is_not_an_error() {
        let directory = InMemoryKeyDirectory::new();
        let cache = SessionKeyCache::new();

        let outcome = unlock(&directory, &cache, "legacy-user", "any-password").unwrap();

        assert_eq!(outcome, UnlockOutcome::LegacyUser);
        assert!(!cache.is_ready());
    }
}
