//! # Key Directory
//!
//! Lookup boundary mapping a user identity to their public key and their
//! protected private-key blob.
//!
//! The production directory is the marketplace's persistent store; this
//! crate owns only the boundary. [`KeyDirectory`] is the contract, and
//! [`InMemoryKeyDirectory`] is the reference implementation used in tests
//! and development.
//!
//! Absence of a record is a normal, non-fatal state: identities created
//! before the encryption feature existed ("legacy users") have no record,
//! and callers must branch on that rather than fail.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::crypto::ProtectedPrivateKeyBlob;
use crate::error::{Error, Result};

/// One identity's stored key material
///
/// Created once at signup, mutated only by an explicit key-rotation
/// feature (not implemented), deleted when the identity is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeyRecord {
    /// Identity this record belongs to (primary key)
    pub user_id: String,
    /// Public key, transport-encoded, stored in the clear
    pub public_key: String,
    /// Private key, protected by the owner's password
    pub encrypted_private_key: ProtectedPrivateKeyBlob,
    /// Record creation time
    pub created_at: DateTime<Utc>,
}

impl StoredKeyRecord {
    /// Create a record stamped with the current time
    pub fn new(
        user_id: impl Into<String>,
        public_key: impl Into<String>,
        encrypted_private_key: ProtectedPrivateKeyBlob,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            public_key: public_key.into(),
            encrypted_private_key,
            created_at: Utc::now(),
        }
    }
}

/// Contract for the key lookup service
pub trait KeyDirectory: Send + Sync {
    /// Store the one key record for a new identity
    ///
    /// ## Errors
    ///
    /// [`Error::KeyRecordExists`] if a record already exists for the
    /// user id. Key issuance is a one-time event; an existing record is
    /// never silently overwritten.
    fn put(&self, record: StoredKeyRecord) -> Result<()>;

    /// Look up a user's key record
    ///
    /// `None` is the expected state for legacy users, not an error.
    fn get(&self, user_id: &str) -> Option<StoredKeyRecord>;

    /// Delete a user's key record, cascading from identity deletion
    ///
    /// Returns whether a record existed.
    fn delete(&self, user_id: &str) -> bool;

    /// Look up just the public key for a user
    fn get_public_key(&self, user_id: &str) -> Option<String> {
        self.get(user_id).map(|record| record.public_key)
    }

    /// Batch public-key lookup
    ///
    /// Unknown ids are omitted from the result rather than erroring
    /// per-id. Implementations backed by a real store should override this
    /// with an in-set query.
    fn get_public_keys(&self, user_ids: &[String]) -> HashMap<String, String> {
        user_ids
            .iter()
            .filter_map(|id| self.get_public_key(id).map(|key| (id.clone(), key)))
            .collect()
    }
}

/// In-memory key directory
///
/// Reference implementation for tests and development; production wires
/// the trait to the marketplace's persistent store.
pub struct InMemoryKeyDirectory {
    records: RwLock<HashMap<String, StoredKeyRecord>>,
}

impl InMemoryKeyDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryKeyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDirectory for InMemoryKeyDirectory {
    fn put(&self, record: StoredKeyRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.user_id) {
            return Err(Error::KeyRecordExists(record.user_id));
        }
        tracing::debug!("storing key record for {}", record.user_id);
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    fn get(&self, user_id: &str) -> Option<StoredKeyRecord> {
        self.records.read().get(user_id).cloned()
    }

    fn delete(&self, user_id: &str) -> bool {
        self.records.write().remove(user_id).is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================
