//! Async facade over the blocking journal backend.
//!
//! `JournalStorage` starts uninitialized; every data operation fails with
//! [`JournalError::NotInitialized`] until [`JournalStorage::initialize`]
//! succeeds. Work runs on tokio's blocking pool so that UI and runtime
//! threads never wait on SQLite, key-store, or cipher calls.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::crypto::KeyManager;
use crate::error::{JournalError, Result};
use crate::storage::sqlite::schema::SchemaReport;
use crate::storage::sqlite::SqliteJournal;
use crate::storage::traits::JournalStore;
use crate::storage::types::{IntegrityReport, JournalEntry, Memory, SearchHit};

/// The journal as seen by application code.
///
/// Cheap to share behind an `Arc`. Concurrent calls are serialized on the
/// single underlying connection.
pub struct JournalStorage {
    config: StorageConfig,
    keys: Arc<KeyManager>,
    journal: OnceCell<Arc<SqliteJournal>>,
}

impl JournalStorage {
    pub fn new(config: StorageConfig, keys: Arc<KeyManager>) -> Self {
        Self {
            config,
            keys,
            journal: OnceCell::new(),
        }
    }

    /// Fetch (or create) the journal key, open the database, and migrate it.
    ///
    /// Idempotent. Concurrent callers share one attempt; if it fails the
    /// storage stays uninitialized and a later call may try again.
    pub async fn initialize(&self) -> Result<()> {
        self.journal
            .get_or_try_init(|| async {
                let keys = Arc::clone(&self.keys);
                let config = self.config.clone();
                let journal = tokio::task::spawn_blocking(move || {
                    let key = keys.get_or_create_key()?;
                    SqliteJournal::open(&config, key)
                })
                .await
                .map_err(|e| JournalError::Worker(e.to_string()))??;

                info!(
                    path = ?journal.path(),
                    recovered = journal.recovered_from_corruption(),
                    key_store = %self.keys.describe(),
                    "Journal storage ready"
                );
                Ok::<_, JournalError>(Arc::new(journal))
            })
            .await?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.journal.initialized()
    }

    /// Whether startup had to delete and recreate the database.
    pub fn recovered_from_corruption(&self) -> bool {
        self.journal
            .get()
            .is_some_and(|journal| journal.recovered_from_corruption())
    }

    pub fn schema_report(&self) -> Result<SchemaReport> {
        Ok(self.ready()?.schema_report().clone())
    }

    fn ready(&self) -> Result<Arc<SqliteJournal>> {
        self.journal
            .get()
            .cloned()
            .ok_or(JournalError::NotInitialized)
    }

    /// Run `op` against the backend on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteJournal) -> Result<T> + Send + 'static,
    {
        let journal = self.ready()?;
        tokio::task::spawn_blocking(move || op(&journal))
            .await
            .map_err(|e| JournalError::Worker(e.to_string()))?
    }

    pub async fn save_entry(&self, entry: &JournalEntry) -> Result<()> {
        let entry = entry.clone();
        self.run(move |journal| journal.save_entry(&entry)).await
    }

    pub async fn load_entry(&self, id: Uuid) -> Result<Option<JournalEntry>> {
        self.run(move |journal| journal.load_entry(&id)).await
    }

    pub async fn load_all_entries(&self) -> Result<Vec<JournalEntry>> {
        self.run(|journal| journal.load_all_entries()).await
    }

    pub async fn load_favorite_entries(&self) -> Result<Vec<JournalEntry>> {
        self.run(|journal| journal.load_favorite_entries()).await
    }

    /// Delete an entry and every memory derived from it.
    pub async fn delete_entry(&self, id: Uuid) -> Result<bool> {
        self.run(move |journal| journal.delete_entry(&id)).await
    }

    /// Entries whose title, content, tags, or mood contain `query`, ignoring case.
    pub async fn search_entries(&self, query: &str) -> Result<Vec<JournalEntry>> {
        Ok(self
            .search_entries_detailed(query)
            .await?
            .into_iter()
            .map(|hit| hit.entry)
            .collect())
    }

    /// Like `search_entries`, also reporting which field matched.
    pub async fn search_entries_detailed(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.to_string();
        self.run(move |journal| journal.search_entries(&query)).await
    }

    pub async fn entry_count(&self) -> Result<usize> {
        self.run(|journal| journal.entry_count()).await
    }

    pub async fn save_memory(&self, memory: &Memory) -> Result<()> {
        let memory = memory.clone();
        self.run(move |journal| journal.save_memory(&memory)).await
    }

    pub async fn load_all_memories(&self) -> Result<Vec<Memory>> {
        self.run(|journal| journal.load_all_memories()).await
    }

    pub async fn memories_for_entry(&self, entry_id: Uuid) -> Result<Vec<Memory>> {
        self.run(move |journal| journal.memories_for_entry(&entry_id))
            .await
    }

    pub async fn delete_memory_by_id(&self, id: Uuid) -> Result<bool> {
        self.run(move |journal| journal.delete_memory_by_id(&id)).await
    }

    pub async fn clear_all_memories(&self) -> Result<usize> {
        self.run(|journal| journal.clear_all_memories()).await
    }

    pub async fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<Memory>> {
        let query = query.to_string();
        self.run(move |journal| journal.search_memories(&query, limit))
            .await
    }

    pub async fn check_integrity(&self) -> Result<IntegrityReport> {
        self.run(|journal| journal.check_integrity()).await
    }
}

impl std::fmt::Debug for JournalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStorage")
            .field("initialized", &self.is_initialized())
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
