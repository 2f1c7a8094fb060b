//! Cryptographic operations for Gemi.
//!
//! - **AES-256-GCM** seals each entry body with a fresh random nonce.
//! - The 256-bit key lives in the platform's secure credential store and is
//!   handed out by [`KeyManager`] for the lifetime of the process.
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft or copying of the journal database file
//! - Silent tampering with stored ciphertext
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Access to an unlocked user session
//!
//! Losing the stored key means losing every journal entry; there is no
//! recovery path and no export.

pub mod codec;
pub mod key;
pub mod keystore;

pub use codec::{decrypt, encrypt};
pub use key::{JournalKey, KEY_LENGTH};
pub use keystore::{KeyManager, KeyStore, KeyfileStore, KeyringStore, MemoryKeyStore};
