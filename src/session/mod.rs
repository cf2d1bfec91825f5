//! # Session Key Cache
//!
//! Process-local, in-memory holder of the current user's decrypted key
//! pair. This is the only bridge between "key is on disk, encrypted" and
//! "key is usable to decrypt a live message".
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SESSION KEY LIFECYCLE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │              load(user, priv, pub)          clear()                    │
//! │   ┌───────┐ ──────────────────────► ┌────────┐ ──────────► ┌───────┐  │
//! │   │ Empty │                         │ Loaded │             │ Empty │  │
//! │   └───────┘ ◄────────────────────── └────────┘             └───────┘  │
//! │              load with invalid keys                                    │
//! │              refused, state unchanged                                  │
//! │                                                                         │
//! │   No intermediate states: a reader never observes one key without      │
//! │   the other. Clearing happens on explicit logout AND on scope/cache    │
//! │   drop, so key material never outlives the authenticated session.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use parking_lot::RwLock;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::crypto::is_valid_key;
use crate::error::{Error, Result};

/// The decrypted key material of one authenticated session
///
/// ## Security
///
/// - Held only in process memory; never derived from or written to a
///   durable store
/// - Zeroized when dropped
/// - `Debug` redacts the private half so key material cannot reach a log
///   through formatting
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKeys {
    user_id: String,
    public_key: String,
    private_key: String,
}

impl SessionKeys {
    /// The identity these keys belong to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Transport-encoded public key
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Transport-encoded private key
    ///
    /// ## Security Warning
    ///
    /// Only use this to decrypt. Never log or persist it.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("user_id", &self.user_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Guarded single-slot cache for the session's key pair
///
/// `load` and `clear` swap the slot atomically with respect to concurrent
/// `is_ready`/accessor calls; there is no half-loaded state to observe.
/// At most one set of keys is held at a time.
pub struct SessionKeyCache {
    slot: RwLock<Option<SessionKeys>>,
}

impl SessionKeyCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Load a decrypted key pair into the session
    ///
    /// Both halves must pass the structural check; otherwise the load is
    /// refused and the previous state (loaded or empty) is left unchanged.
    /// Either both keys are set or neither is.
    ///
    /// ## Errors
    ///
    /// [`Error::KeyDecode`] when either key fails structural validation.
    pub fn load(&self, user_id: &str, private_key: &str, public_key: &str) -> Result<()> {
        if !is_valid_key(private_key) || !is_valid_key(public_key) {
            tracing::warn!(
                "refusing session key load for {}: malformed key material",
                user_id
            );
            return Err(Error::KeyDecode(
                "session keys failed structural validation".into(),
            ));
        }

        let keys = SessionKeys {
            user_id: user_id.to_string(),
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
        };
        *self.slot.write() = Some(keys);
        tracing::info!("session keys loaded for {}", user_id);
        Ok(())
    }

    /// Clear the session, discarding key material
    ///
    /// Invoked on explicit logout; also runs when the cache or a
    /// [`SessionScope`] is dropped. The dropped keys are zeroized.
    pub fn clear(&self) {
        let had_keys = self.slot.write().take().is_some();
        if had_keys {
            tracing::info!("session keys cleared");
        }
    }

    /// Check whether a complete key pair is loaded
    pub fn is_ready(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The identity of the loaded session, if any
    pub fn user_id(&self) -> Option<String> {
        self.slot.read().as_ref().map(|k| k.user_id.clone())
    }

    /// The loaded public key, if any
    pub fn public_key(&self) -> Option<String> {
        self.slot.read().as_ref().map(|k| k.public_key.clone())
    }

    /// The loaded private key, if any
    ///
    /// The returned copy is zeroized on drop.
    pub fn private_key(&self) -> Option<Zeroizing<String>> {
        self.slot
            .read()
            .as_ref()
            .map(|k| Zeroizing::new(k.private_key.clone()))
    }

    /// Get the loaded keys, failing fast when the session is empty
    ///
    /// For calling code that strictly requires keys. Unlike the accessors,
    /// an empty session here is a sequencing bug upstream, not a normal
    /// branch.
    ///
    /// ## Errors
    ///
    /// [`Error::KeysNotLoaded`] in the Empty state.
    pub fn require(&self) -> Result<SessionKeys> {
        self.slot.read().clone().ok_or(Error::KeysNotLoaded)
    }

    /// Tie this cache's lifetime to a scope
    ///
    /// The returned guard clears the cache when dropped, however the scope
    /// exits. Hook this to session teardown so keys cannot outlive the
    /// authenticated session.
    pub fn scoped(&self) -> SessionScope<'_> {
        SessionScope { cache: self }
    }
}

impl Default for SessionKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionKeyCache {
    fn drop(&mut self) {
        // SessionKeys zeroizes itself on drop; clearing here keeps the
        // logout log line consistent for the owned-cache teardown path.
        self.clear();
    }
}

/// Scope guard that clears a [`SessionKeyCache`] on drop
///
/// Guaranteed-release companion to [`SessionKeyCache::scoped`].
pub struct SessionScope<'a> {
    cache: &'a SessionKeyCache,
}

impl SessionScope<'_> {
    /// The guarded cache
    pub fn cache(&self) -> &SessionKeyCache {
        self.cache
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        self.cache.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn fake_key(tag: &str) -> String {
        // Structurally valid transport material; the cache checks shape,
        // not cryptographic validity.
        BASE64.encode(format!("key-material-{}", tag))
    }

    #[test]
    fn test_load_then_accessors_return_exact_values() {
        let cache = SessionKeyCache::new();
        let private = fake_key("private");
        let public = fake_key("public");

        cache.load("user-1", &private, &public).unwrap();

        assert!(cache.is_ready());
        assert_eq!(cache.user_id().as_deref(), Some("user-1"));
        assert_eq!(cache.public_key().as_deref(), Some(public.as_str()));
        assert_eq!(
            cache.private_key().as_deref().map(String::as_str),
            Some(private.as_str())
        );
    }

    #[test]
    fn test_clear_empties_and_accessors_go_absent() {
        let cache = SessionKeyCache::new();
        cache
            .load("user-1", &fake_key("private"), &fake_key("public"))
            .unwrap();

        cache.clear();

        assert!(!cache.is_ready());
        assert!(cache.user_id().is_none());
        assert!(cache.public_key().is_none());
        assert!(cache.private_key().is_none());
    }

    #[test]
    fn test_require_fails_fast_when_empty() {
        let cache = SessionKeyCache::new();
        assert!(matches!(cache.require(), Err(Error::KeysNotLoaded)));

        cache
            .load("user-1", &fake_key("private"), &fake_key("public"))
            .unwrap();
        let keys = cache.require().unwrap();
        assert_eq!(keys.user_id(), "user-1");
    }

    #[test]
    fn test_invalid_key_refused_and_state_unchanged() {
        let cache = SessionKeyCache::new();
        let private = fake_key("private");
        let public = fake_key("public");
        cache.load("user-1", &private, &public).unwrap();

        // Neither half may be malformed; the loaded session survives.
        assert!(cache.load("user-2", "not base64!!", &public).is_err());
        assert!(cache.load("user-2", &private, "").is_err());

        assert_eq!(cache.user_id().as_deref(), Some("user-1"));
        assert_eq!(cache.public_key().as_deref(), Some(public.as_str()));
    }

    #[test]
    fn test_invalid_load_into_empty_cache_stays_empty() {
        let cache = SessionKeyCache::new();
        assert!(cache.load("user-1", "", "").is_err());
        assert!(!cache.is_ready());
    }

    #[test]
    fn test_reload_replaces_previous_session() {
        let cache = SessionKeyCache::new();
        cache
            .load("user-1", &fake_key("a-priv"), &fake_key("a-pub"))
            .unwrap();
        cache
            .load("user-2", &fake_key("b-priv"), &fake_key("b-pub"))
            .unwrap();

        assert_eq!(cache.user_id().as_deref(), Some("user-2"));
    }

    #[test]
    fn test_scope_clears_on_drop() {
        let cache = SessionKeyCache::new();
        {
            let scope = cache.scoped();
            scope
                .cache()
                .load("user-1", &fake_key("private"), &fake_key("public"))
                .unwrap();
            assert!(cache.is_ready());
        }
        assert!(!cache.is_ready());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let cache = SessionKeyCache::new();
        let private = fake_key("private");
        cache.load("user-1", &private, &fake_key("public")).unwrap();

        let debug = format!("{:?}", cache.require().unwrap());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&private));
    }
}
