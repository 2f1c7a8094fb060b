//! Storage trait definitions.
//!
//! This module defines the abstract interface that all journal backends must
//! implement. Operations are blocking; the async facade in
//! [`crate::storage::JournalStorage`] runs them on a blocking pool.

use uuid::Uuid;

use crate::error::Result;
use crate::storage::types::{IntegrityReport, JournalEntry, Memory, SearchHit};

/// A blocking journal backend.
///
/// # Security Invariants
///
/// - Entry `content` must be sealed before it is written and must never be
///   written, logged, or returned in plaintext form outside a successful
///   decrypt.
/// - A failed decrypt is an error, never an empty or partial entry.
/// - Deleting an entry deletes every memory derived from it.
pub trait JournalStore: Send + Sync {
    /// Insert or fully replace an entry by id.
    ///
    /// Replacing an entry leaves its memories in place.
    fn save_entry(&self, entry: &JournalEntry) -> Result<()>;

    /// Load one entry by id.
    fn load_entry(&self, id: &Uuid) -> Result<Option<JournalEntry>>;

    /// All entries, newest `created_at` first.
    fn load_all_entries(&self) -> Result<Vec<JournalEntry>>;

    /// Favorite entries, newest first.
    fn load_favorite_entries(&self) -> Result<Vec<JournalEntry>>;

    /// Delete an entry and its memories. Returns whether the entry existed.
    fn delete_entry(&self, id: &Uuid) -> Result<bool>;

    /// Case-insensitive substring search over title, content, tags and mood.
    ///
    /// Results keep the newest-first order of `load_all_entries`.
    fn search_entries(&self, query: &str) -> Result<Vec<SearchHit>>;

    fn entry_count(&self) -> Result<usize>;

    /// Insert or replace a memory by id. The source entry must exist.
    fn save_memory(&self, memory: &Memory) -> Result<()>;

    /// All memories, newest `extracted_at` first.
    fn load_all_memories(&self) -> Result<Vec<Memory>>;

    /// Memories derived from one entry, newest first.
    fn memories_for_entry(&self, entry_id: &Uuid) -> Result<Vec<Memory>>;

    /// Returns whether the memory existed.
    fn delete_memory_by_id(&self, id: &Uuid) -> Result<bool>;

    /// Delete every memory; entries are untouched. Returns the number removed.
    fn clear_all_memories(&self) -> Result<usize>;

    /// Case-insensitive substring match on memory content, newest first, at most `limit`.
    fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<Memory>>;

    /// Verify referential integrity and that every entry still decrypts.
    fn check_integrity(&self) -> Result<IntegrityReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_store(_store: &dyn JournalStore) {}
        fn _accepts_boxed(_store: Box<dyn JournalStore>) {}
    }
}
