//! # Bazaar E2EE Core
//!
//! The end-to-end-encrypted messaging core of the Bazaar marketplace:
//! key-pair generation, password-based protection of the private key at
//! rest, per-message asymmetric encryption, and the session-scoped key
//! cache that mediates between "key is on disk, encrypted" and "key is
//! usable to decrypt a live message".
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CORE MODULES                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────────────┐    │
//! │  │  Identity   │  │   Session   │  │        Conversation          │    │
//! │  │             │  │             │  │                              │    │
//! │  │ - Enroll    │  │ - Key cache │  │ - Decrypt-on-read            │    │
//! │  │ - Unlock    │  │ - Scoped    │  │ - Encrypt-on-write (policy)  │    │
//! │  │             │  │   teardown  │  │ - Previews / summaries       │    │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────────┬───────────────┘    │
//! │         │                │                        │                    │
//! │         └────────────────┴────────────────────────┘                    │
//! │                                   │                                     │
//! │  ┌─────────────┐  ┌───────────────────────────────────────────────┐    │
//! │  │  Directory  │  │                  Crypto                       │    │
//! │  │             │  │                                               │    │
//! │  │ - Key       │◄─┤ - RSA-OAEP key codec and message cipher       │    │
//! │  │   records   │  │ - PBKDF2 + AES-GCM private-key vault          │    │
//! │  └─────────────┘  └───────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - A private key exists in exactly three forms: inside the generator,
//!   inside the password-protected vault blob, and inside the in-memory
//!   session cache. It is never persisted or logged in decoded form.
//! - Opening the vault fails closed: a wrong password and a corrupted blob
//!   are indistinguishable.
//! - Message decryption never crashes a conversation: undecryptable bodies
//!   render as an explicit placeholder.
//! - The session cache cannot outlive the authenticated session: clearing
//!   is hooked to logout, scope exit, and drop.
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key codec, message cipher, private-key vault
//! - [`session`] - Session-scoped key cache
//! - [`directory`] - Key lookup boundary (trait + in-memory reference)
//! - [`conversation`] - Decrypt-on-read / encrypt-on-write orchestration
//! - [`identity`] - Signup (enroll) and login (unlock) flows

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod conversation;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod identity;
pub mod session;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use conversation::{
    ConversationCodec, ConversationSummary, EncryptionDecision, Message, OutboundContent,
    OutboundPolicy,
};
pub use crypto::{DecryptOutcome, KeyPair, ProtectedPrivateKeyBlob};
pub use directory::{InMemoryKeyDirectory, KeyDirectory, StoredKeyRecord};
pub use error::{Error, Result};
pub use identity::{enroll, unlock, EnrolledIdentity, UnlockOutcome};
pub use session::{SessionKeyCache, SessionKeys, SessionScope};
