//! Storage configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/gemi"
//! database_file = "journal.sqlite"
//! busy_timeout_ms = 5000
//! recover_corrupt_database = true
//!
//! [key_store]
//! backend = "keychain"
//! service = "gemi"
//! account = "journal-encryption-key"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::keystore::{DEFAULT_ACCOUNT, DEFAULT_SERVICE};
use crate::crypto::{KeyManager, KeyfileStore, KeyringStore};
use crate::error::{JournalError, Result};

const APP_DIR: &str = "gemi";
const DEFAULT_DATABASE_FILE: &str = "journal.sqlite";
const DEFAULT_KEYFILE: &str = "journal.key";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Application-private directory; defaults to `$XDG_DATA_HOME/gemi`.
    pub data_dir: Option<PathBuf>,
    pub database_file: String,
    /// Keep the database in memory (tests and dry runs).
    pub in_memory: bool,
    pub busy_timeout_ms: u64,
    /// Delete and recreate the database once if startup fails. Destructive.
    pub recover_corrupt_database: bool,
    pub key_store: KeyStoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreSection {
    pub backend: KeyStoreBackend,
    pub service: String,
    pub account: String,
    /// Keyfile path for the `keyfile` backend; defaults to `<data_dir>/journal.key`.
    pub keyfile: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStoreBackend {
    #[default]
    Keychain,
    Keyfile,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            in_memory: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            recover_corrupt_database: true,
            key_store: KeyStoreSection::default(),
        }
    }
}

impl Default for KeyStoreSection {
    fn default() -> Self {
        Self {
            backend: KeyStoreBackend::Keychain,
            service: DEFAULT_SERVICE.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
            keyfile: None,
        }
    }
}

impl StorageConfig {
    /// A config whose database lives in `data_dir`.
    pub fn at_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// A config for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| JournalError::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JournalError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolve the configured data directory.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    pub fn database_location(&self) -> Result<DatabaseLocation> {
        if self.in_memory {
            return Ok(DatabaseLocation::InMemory);
        }
        if self.database_file.trim().is_empty() {
            return Err(JournalError::Config(
                "database_file must not be empty".to_string(),
            ));
        }
        Ok(DatabaseLocation::File(
            self.resolved_data_dir()?.join(&self.database_file),
        ))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Build the key manager for the configured backend.
    pub fn key_manager(&self) -> Result<KeyManager> {
        let section = &self.key_store;
        match section.backend {
            KeyStoreBackend::Keychain => Ok(KeyManager::new(KeyringStore::new(
                section.service.clone(),
                section.account.clone(),
            ))),
            KeyStoreBackend::Keyfile => {
                let path = match &section.keyfile {
                    Some(path) => path.clone(),
                    None => self.resolved_data_dir()?.join(DEFAULT_KEYFILE),
                };
                Ok(KeyManager::new(KeyfileStore::new(path)))
            }
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join(APP_DIR))
}

pub fn xdg_config_dir() -> Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".config").join(APP_DIR))
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| {
        JournalError::Config("HOME is not set; cannot resolve default paths".to_string())
    })?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = StorageConfig::from_toml_str("").unwrap();
        assert_eq!(config.database_file, "journal.sqlite");
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert!(config.recover_corrupt_database);
        assert!(!config.in_memory);
        assert_eq!(config.key_store.backend, KeyStoreBackend::Keychain);
        assert_eq!(config.key_store.service, "gemi");
    }

    #[test]
    fn test_parse_full_document() {
        let config = StorageConfig::from_toml_str(
            r#"
            data_dir = "/srv/gemi"
            database_file = "diary.db"
            busy_timeout_ms = 250
            recover_corrupt_database = false

            [key_store]
            backend = "keyfile"
            keyfile = "/srv/gemi/k"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database_location().unwrap(),
            DatabaseLocation::File(PathBuf::from("/srv/gemi/diary.db"))
        );
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert!(!config.recover_corrupt_database);
        assert_eq!(config.key_store.backend, KeyStoreBackend::Keyfile);
        assert!(config.key_manager().unwrap().describe().contains("/srv/gemi/k"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = StorageConfig::from_toml_str("[key_store]\nbackend = \"cloud\"\n");
        assert!(matches!(result, Err(JournalError::Config(_))));
    }

    #[test]
    fn test_in_memory_location() {
        assert_eq!(
            StorageConfig::in_memory().database_location().unwrap(),
            DatabaseLocation::InMemory
        );
    }

    #[test]
    fn test_empty_database_file_rejected() {
        let mut config = StorageConfig::at_dir("/tmp/gemi");
        config.database_file = " ".to_string();
        assert!(config.database_location().is_err());
    }
}
