//! Application context for the Gemi CLI.
//!
//! Resolves the storage config from CLI arguments and builds the key manager
//! and storage engine explicitly. Nothing here is global.

use std::path::PathBuf;
use std::sync::Arc;

use gemi_core::config::default_config_path;
use gemi_core::{JournalError, JournalStorage, StorageConfig};
use tracing::debug;

use crate::cli::Cli;

/// Application context that bundles CLI args with the resolved config.
pub struct AppContext<'a> {
    cli: &'a Cli,
    config: StorageConfig,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> anyhow::Result<Self> {
        let config = load_config(cli)?;
        Ok(Self { cli, config })
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    pub fn json(&self) -> bool {
        self.cli.json
    }

    /// Build the storage engine and run startup (key fetch, schema setup).
    pub async fn open_storage(&self) -> anyhow::Result<JournalStorage> {
        let keys = Arc::new(self.config.key_manager()?);
        let storage = JournalStorage::new(self.config.clone(), keys);
        storage.initialize().await?;
        if storage.recovered_from_corruption() {
            eprintln!(
                "Warning: the journal database could not be opened and was recreated empty."
            );
        }
        Ok(storage)
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = match resolve_config_path(cli) {
        Some(path) => {
            debug!(path = %path.display(), "Loading config");
            StorageConfig::load(&path)?
        }
        None => StorageConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

/// An explicit `--config` must exist; the default location is optional.
fn resolve_config_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.config {
        return Some(path.clone());
    }
    default_config_path().ok().filter(|path| path.exists())
}

/// A follow-up suggestion for errors the user can act on.
pub fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    let err = err.downcast_ref::<JournalError>()?;
    match err {
        JournalError::KeyStore(_) => Some(
            "Unlock your keychain, or set `backend = \"keyfile\"` under [key_store] in the config.",
        ),
        JournalError::Decryption(_) => Some(
            "An entry could not be decrypted with the stored key. Run `gemi check` to list affected entries.",
        ),
        JournalError::Schema(_) => {
            Some("Set `recover_corrupt_database = true` to recreate an unreadable database.")
        }
        JournalError::Config(_) => Some("Check the file passed with --config or $GEMI_CONFIG."),
        _ if err.is_retryable() => Some("The database was busy or failed; try again."),
        _ => None,
    }
}
