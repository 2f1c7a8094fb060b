//! Key lifecycle: obtaining or creating the journal key in a secure store.
//!
//! The key never leaves the device. It is kept in one named credential of the
//! OS credential store (Keychain, Secret Service, Credential Manager) and is
//! readable only while the user's session is unlocked. There is deliberately
//! no ephemeral fallback: if the store cannot be reached, every encrypt and
//! decrypt call fails with `JournalError::KeyStore` instead of quietly using a
//! key that would be gone on the next launch.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::crypto::key::JournalKey;
use crate::error::{JournalError, Result};

/// Default credential-store service name.
pub const DEFAULT_SERVICE: &str = "gemi";

/// Default credential-store account name.
pub const DEFAULT_ACCOUNT: &str = "journal-encryption-key";

/// A secure place to keep the encoded journal key.
///
/// Implementations block; async callers should run them on a blocking pool.
pub trait KeyStore: Send + Sync {
    /// Read the stored secret, or `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;

    /// Persist `secret`, replacing any previous value.
    fn store(&self, secret: &str) -> Result<()>;

    /// Remove the stored secret. Missing secrets are not an error.
    fn clear(&self) -> Result<()>;

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Key storage in the OS credential store via `keyring`.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
    account: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| JournalError::KeyStore(format!("Keychain entry failed: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE, DEFAULT_ACCOUNT)
    }
}

impl KeyStore for KeyringStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(JournalError::KeyStore(format!("Keychain read failed: {}", err))),
        }
    }

    fn store(&self, secret: &str) -> Result<()> {
        self.entry()?
            .set_password(secret)
            .map_err(|e| JournalError::KeyStore(format!("Keychain write failed: {}", e)))
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(JournalError::KeyStore(format!(
                "Keychain delete failed: {}",
                err
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("keychain {}/{}", self.service, self.account)
    }
}

/// Key storage in an owner-only file, for hosts without a credential service.
///
/// The file holds the encoded key in the clear; anyone who can read it can
/// read the journal.
#[derive(Debug, Clone)]
pub struct KeyfileStore {
    path: PathBuf,
}

impl KeyfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyStore for KeyfileStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(JournalError::KeyStore(format!(
                "Failed to read keyfile {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn store(&self, secret: &str) -> Result<()> {
        crate::fs::write_private_atomic(&self.path, secret.as_bytes()).map_err(|e| {
            JournalError::KeyStore(format!(
                "Failed to write keyfile {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(JournalError::KeyStore(format!(
                "Failed to remove keyfile {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("keyfile {}", self.path.display())
    }
}

/// In-process key storage. Clones share one slot, so a clone handed to a
/// second `KeyManager` behaves like the same credential after a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    slot: Arc<Mutex<Option<String>>>,
    unavailable: bool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every call, as a locked or missing credential service would.
    pub fn unavailable() -> Self {
        Self {
            slot: Arc::default(),
            unavailable: true,
        }
    }

    fn slot(&self) -> Result<MutexGuard<'_, Option<String>>> {
        if self.unavailable {
            return Err(JournalError::KeyStore(
                "Credential store is unavailable".to_string(),
            ));
        }
        self.slot
            .lock()
            .map_err(|_| JournalError::KeyStore("Key slot poisoned".to_string()))
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn store(&self, secret: &str) -> Result<()> {
        *self.slot()? = Some(secret.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory key slot".to_string()
    }
}

/// Hands out one journal key for the lifetime of the process.
pub struct KeyManager {
    store: Box<dyn KeyStore>,
    cached: Mutex<Option<JournalKey>>,
}

impl KeyManager {
    pub fn new(store: impl KeyStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cached: Mutex::new(None),
        }
    }

    /// Return the journal key, loading it or creating and persisting a new one on first use.
    ///
    /// Idempotent: every call in a process returns the same key. A stored
    /// value that cannot be decoded is reported, never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `JournalError::KeyStore` if the store cannot be read or the
    /// new key cannot be persisted.
    pub fn get_or_create_key(&self) -> Result<JournalKey> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| JournalError::KeyStore("Key cache poisoned".to_string()))?;
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = match self.store.load()? {
            Some(encoded) => {
                debug!(store = %self.store.describe(), "Loaded journal key");
                JournalKey::from_encoded(&encoded)?
            }
            None => {
                let key = JournalKey::generate()?;
                self.store.store(&key.to_encoded())?;
                info!(store = %self.store.describe(), "Generated new journal key");
                key
            }
        };

        *cached = Some(key.clone());
        Ok(key)
    }

    /// Location of the backing store, for diagnostics.
    pub fn describe(&self) -> String {
        self.store.describe()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("store", &self.store.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let manager = KeyManager::new(MemoryKeyStore::new());
        let first = manager.get_or_create_key().unwrap();
        let second = manager.get_or_create_key().unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_key_survives_restart() {
        let store = MemoryKeyStore::new();
        let before = KeyManager::new(store.clone()).get_or_create_key().unwrap();
        let after = KeyManager::new(store).get_or_create_key().unwrap();
        assert_eq!(before.as_bytes(), after.as_bytes());
    }

    #[test]
    fn test_unavailable_store_is_fatal() {
        let manager = KeyManager::new(MemoryKeyStore::unavailable());
        let result = manager.get_or_create_key();
        assert!(matches!(result, Err(JournalError::KeyStore(_))));
    }

    #[test]
    fn test_corrupt_stored_key_is_not_replaced() {
        let store = MemoryKeyStore::new();
        store.store("definitely-not-a-key").unwrap();

        let manager = KeyManager::new(store.clone());
        assert!(manager.get_or_create_key().is_err());
        assert_eq!(
            store.load().unwrap().as_deref(),
            Some("definitely-not-a-key")
        );
    }

    #[test]
    fn test_keyfile_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys").join("journal.key");
        let store = KeyfileStore::new(&path);

        assert!(store.load().unwrap().is_none());
        let key = KeyManager::new(store.clone()).get_or_create_key().unwrap();
        assert!(path.exists());

        let reloaded = KeyManager::new(store.clone()).get_or_create_key().unwrap();
        assert_eq!(key.as_bytes(), reloaded.as_bytes());

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_keyfile_created_despite_stale_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.key");
        std::fs::write(
            dir.path().join(format!("journal.key.{}.tmp", std::process::id())),
            b"partial",
        )
        .unwrap();

        let key = KeyManager::new(KeyfileStore::new(&path))
            .get_or_create_key()
            .unwrap();
        let reloaded = KeyManager::new(KeyfileStore::new(&path))
            .get_or_create_key()
            .unwrap();
        assert_eq!(key.as_bytes(), reloaded.as_bytes());
    }
}
