//! # Gemi Core
//!
//! Core library for Gemi - an on-device, encrypted personal journal.
//!
//! Entry bodies are sealed with AES-256-GCM under a single device key kept in
//! the OS credential store. Entries and the memories extracted from them live
//! in a local SQLite database.
//!
//! ## Architecture
//!
//! - **crypto**: Content codec, key type, and key stores
//! - **storage**: Schema management, the SQLite backend, search, and the async facade
//! - **config**: Data directory, database, and key-store settings
//! - **fs**: Owner-only file and directory helpers

pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod storage;

pub use config::StorageConfig;
pub use crypto::{JournalKey, KeyManager};
pub use error::{JournalError, Result};
pub use storage::{
    IntegrityReport, JournalEntry, JournalStorage, JournalStore, MatchField, Memory, Mood,
    SearchHit,
};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
