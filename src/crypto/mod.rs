//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by the messaging
//! core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY LIFECYCLE                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  RSA-2048 Key Pair (generated once, at signup)                 │   │
//! │  │            │                                                    │   │
//! │  │     ┌──────┴───────┐                                            │   │
//! │  │     ▼              ▼                                            │   │
//! │  │  Public Key     Private Key                                    │   │
//! │  │  (SPKI DER,     (PKCS#8 DER, base64)                           │   │
//! │  │   base64)            │                                          │   │
//! │  │     │                ▼                                          │   │
//! │  │     │         PBKDF2-SHA256 (100k rounds, fresh salt)          │   │
//! │  │     │                │                                          │   │
//! │  │     │                ▼                                          │   │
//! │  │     │         AES-256-GCM (fresh 96-bit nonce)                 │   │
//! │  │     │                │                                          │   │
//! │  │     ▼                ▼                                          │   │
//! │  │  stored in      stored as protected blob                       │   │
//! │  │  the clear      (salt ‖ nonce ‖ ciphertext)                    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 MESSAGE ENCRYPTION                              │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  RSA-OAEP with SHA-256, directly over the message bytes.       │   │
//! │  │                                                                 │   │
//! │  │  Ciphertext = RSA-OAEP(recipient_public_key, utf8(plaintext))  │   │
//! │  │                                                                 │   │
//! │  │  • Plaintext bounded by the modulus (190 bytes at 2048 bits)   │   │
//! │  │  • No hybrid (symmetric session key) scheme                    │   │
//! │  │  • Decryptability == private-key possession                    │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | RSA-2048 OAEP/SHA-256 | Message encryption | Semantic security, interop-standard key formats |
//! | AES-256-GCM | Private key at rest | AEAD: tampering and wrong passwords both fail closed |
//! | PBKDF2-HMAC-SHA256 | Password derivation | Deliberately slow, industry standard |
//! | SPKI / PKCS#8 + base64 | Transport encoding | Standard interchange formats, text-safe |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Secret key material is zeroized when dropped
//! 2. **Secure Random**: All randomness comes from `rand::rngs::OsRng`
//! 3. **No Nonce Reuse**: Fresh salt and nonce on every vault operation
//! 4. **Fail Closed**: A wrong password never yields wrong plaintext

mod cipher;
mod keys;
mod vault;

pub use cipher::{
    decrypt, encrypt, max_plaintext_size, DecryptOutcome, MAX_PLAINTEXT_SIZE,
    UNDECRYPTABLE_PLACEHOLDER,
};
pub use keys::{
    decode_private_key, decode_public_key, encode_private_key, encode_public_key, fingerprint,
    is_valid_key, verify_fingerprint, KeyPair, MODULUS_BITS,
};
pub use vault::{
    open, protect, ProtectedPrivateKeyBlob, NONCE_SIZE, PBKDF2_ITERATIONS, SALT_SIZE,
};
