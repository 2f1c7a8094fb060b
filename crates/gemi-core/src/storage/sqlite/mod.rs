//! SQLite journal backend.
//!
//! One connection per process, guarded by a mutex so that at most one logical
//! operation touches it at a time. Entry bodies are sealed with the journal
//! key before they are bound to a statement; titles, tags, and the rest of the
//! metadata are stored in plaintext for listing.

mod row;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DatabaseLocation, StorageConfig};
use crate::crypto::{encrypt, JournalKey};
use crate::error::{JournalError, Result};
use crate::fs::{ensure_private_dir, remove_database_files, restrict_database_files};
use crate::storage::search::{search_hits, Query};
use crate::storage::traits::JournalStore;
use crate::storage::types::{normalize_tags, IntegrityReport, JournalEntry, Memory, SearchHit};

use row::{format_timestamp, EntryRow, MemoryRow, ENTRY_COLUMNS, MEMORY_COLUMNS};
use schema::SchemaReport;

const UPSERT_ENTRY: &str = "INSERT INTO entries \
     (id, title, content, created_at, modified_at, is_favorite, mood, tags, location, weather) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
     ON CONFLICT(id) DO UPDATE SET \
     title = excluded.title, \
     content = excluded.content, \
     created_at = excluded.created_at, \
     modified_at = excluded.modified_at, \
     is_favorite = excluded.is_favorite, \
     mood = excluded.mood, \
     tags = excluded.tags, \
     location = excluded.location, \
     weather = excluded.weather";

const UPSERT_MEMORY: &str = "INSERT INTO memories (id, content, source_entry_id, extracted_at) \
     VALUES (?1, ?2, ?3, ?4) \
     ON CONFLICT(id) DO UPDATE SET \
     content = excluded.content, \
     source_entry_id = excluded.source_entry_id, \
     extracted_at = excluded.extracted_at";

/// SQLite-backed journal with AES-GCM sealed entry bodies.
pub struct SqliteJournal {
    conn: Mutex<Connection>,
    key: JournalKey,
    path: Option<PathBuf>,
    schema: SchemaReport,
    recovered: bool,
}

impl SqliteJournal {
    /// Open (creating if needed) the database described by `config` and bring
    /// its schema up to date.
    ///
    /// If the file cannot be opened or migrated and
    /// `config.recover_corrupt_database` is set, the database and its WAL
    /// companions are deleted and setup is attempted once more. Everything
    /// stored in the old file is lost.
    pub fn open(config: &StorageConfig, key: JournalKey) -> Result<Self> {
        let busy_timeout = config.busy_timeout();
        match config.database_location()? {
            DatabaseLocation::InMemory => {
                let mut conn = Connection::open_in_memory()
                    .map_err(|e| JournalError::Schema(format!("open in-memory database: {}", e)))?;
                let schema = Self::prepare(&mut conn, busy_timeout)?;
                Ok(Self::assemble(conn, key, None, schema, false))
            }
            DatabaseLocation::File(path) => {
                let (conn, schema, recovered) =
                    Self::open_file(&path, busy_timeout, config.recover_corrupt_database)?;
                Ok(Self::assemble(conn, key, Some(path), schema, recovered))
            }
        }
    }

    fn assemble(
        conn: Connection,
        key: JournalKey,
        path: Option<PathBuf>,
        schema: SchemaReport,
        recovered: bool,
    ) -> Self {
        Self {
            conn: Mutex::new(conn),
            key,
            path,
            schema,
            recovered,
        }
    }

    fn open_file(
        path: &Path,
        busy_timeout: Duration,
        recover: bool,
    ) -> Result<(Connection, SchemaReport, bool)> {
        match Self::try_open_file(path, busy_timeout) {
            Ok((conn, schema)) => Ok((conn, schema, false)),
            Err(err) if recover => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Database setup failed; deleting it and starting empty"
                );
                remove_database_files(path)?;
                let (conn, schema) = Self::try_open_file(path, busy_timeout)?;
                info!(path = %path.display(), "Recreated journal database");
                Ok((conn, schema, true))
            }
            Err(err) => Err(err),
        }
    }

    fn try_open_file(path: &Path, busy_timeout: Duration) -> Result<(Connection, SchemaReport)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_private_dir(parent)?;
        }
        let mut conn = Connection::open(path).map_err(|e| {
            JournalError::Schema(format!("open database {}: {}", path.display(), e))
        })?;
        let schema = Self::prepare(&mut conn, busy_timeout)?;
        restrict_database_files(path)?;
        Ok((conn, schema))
    }

    fn prepare(conn: &mut Connection, busy_timeout: Duration) -> Result<SchemaReport> {
        schema::prepare_connection(conn, busy_timeout)?;
        schema::setup(conn)
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| JournalError::Worker("SQLite connection poisoned".to_string()))
    }

    /// What schema setup found and changed when the database was opened.
    pub fn schema_report(&self) -> &SchemaReport {
        &self.schema
    }

    /// Whether the database was deleted and recreated during `open`.
    pub fn recovered_from_corruption(&self) -> bool {
        self.recovered
    }

    /// The database file, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn entry_rows(&self, sql: &str, params: impl Params) -> Result<Vec<EntryRow>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(JournalError::statement("prepare entry query"))?;
        let rows = stmt
            .query_map(params, EntryRow::from_row)
            .map_err(JournalError::read("query entries"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(JournalError::read("read entry row"))?;
        Ok(rows)
    }

    /// Decrypt rows after the connection lock is released.
    fn query_entries(&self, sql: &str, params: impl Params) -> Result<Vec<JournalEntry>> {
        self.entry_rows(sql, params)?
            .into_iter()
            .map(|row| {
                row.decrypt(&self.key).inspect_err(|err| {
                    if err.is_data_loss() {
                        warn!(error = %err, "Entry failed to decrypt");
                    }
                })
            })
            .collect()
    }

    fn query_memories(&self, sql: &str, params: impl Params) -> Result<Vec<Memory>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(JournalError::statement("prepare memory query"))?;
        let rows = stmt
            .query_map(params, MemoryRow::from_row)
            .map_err(JournalError::read("query memories"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(JournalError::read("read memory row"))?;
        rows.into_iter().map(Memory::try_from).collect()
    }

    fn count_rows(conn: &Connection, table: &'static str) -> Result<usize> {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .map_err(JournalError::read("count rows"))?;
        Ok(count.max(0) as usize)
    }
}

impl JournalStore for SqliteJournal {
    fn save_entry(&self, entry: &JournalEntry) -> Result<()> {
        let sealed = encrypt(&entry.content, &self.key)?;
        let tags = serde_json::to_string(&normalize_tags(entry.tags.iter().cloned()))?;

        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare_cached(UPSERT_ENTRY)
            .map_err(JournalError::statement("prepare entry upsert"))?;
        stmt.execute(params![
            entry.id.to_string(),
            entry.title,
            sealed,
            format_timestamp(&entry.created_at),
            format_timestamp(&entry.modified_at),
            entry.is_favorite,
            entry.mood.map(|mood| mood.as_str()),
            tags,
            entry.location,
            entry.weather,
        ])
        .map_err(JournalError::write("save entry"))?;

        debug!(entry_id = %entry.id, sealed_len = sealed.len(), "Saved entry");
        Ok(())
    }

    fn load_entry(&self, id: &Uuid) -> Result<Option<JournalEntry>> {
        let row = {
            let conn = self.lock_conn()?;
            conn.query_row(
                &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
                [id.to_string()],
                EntryRow::from_row,
            )
            .optional()
            .map_err(JournalError::read("load entry"))?
        };
        row.map(|row| row.decrypt(&self.key)).transpose()
    }

    fn load_all_entries(&self) -> Result<Vec<JournalEntry>> {
        let entries = self.query_entries(
            &format!(
                "SELECT {} FROM entries ORDER BY created_at DESC, id",
                ENTRY_COLUMNS
            ),
            [],
        )?;
        debug!(count = entries.len(), "Loaded entries");
        Ok(entries)
    }

    fn load_favorite_entries(&self) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM entries WHERE is_favorite = 1 ORDER BY created_at DESC, id",
                ENTRY_COLUMNS
            ),
            [],
        )
    }

    fn delete_entry(&self, id: &Uuid) -> Result<bool> {
        let id_str = id.to_string();
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(JournalError::statement("begin entry delete"))?;
        let cascaded: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE source_entry_id = ?1",
                [&id_str],
                |row| row.get(0),
            )
            .map_err(JournalError::read("count derived memories"))?;
        let removed = tx
            .execute("DELETE FROM entries WHERE id = ?1", [&id_str])
            .map_err(JournalError::delete("delete entry"))?;
        tx.commit()
            .map_err(JournalError::delete("commit entry delete"))?;

        if removed > 0 {
            info!(entry_id = %id, cascaded_memories = cascaded, "Deleted entry");
        } else {
            debug!(entry_id = %id, "Delete requested for unknown entry");
        }
        Ok(removed > 0)
    }

    fn search_entries(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = Query::new(query);
        let hits = search_hits(self.load_all_entries()?, &query);
        debug!(hits = hits.len(), "Searched entries");
        Ok(hits)
    }

    fn entry_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        Self::count_rows(&conn, "entries")
    }

    fn save_memory(&self, memory: &Memory) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare_cached(UPSERT_MEMORY)
            .map_err(JournalError::statement("prepare memory upsert"))?;
        stmt.execute(params![
            memory.id.to_string(),
            memory.content,
            memory.source_entry_id.to_string(),
            format_timestamp(&memory.extracted_at),
        ])
        .map_err(JournalError::write("save memory"))?;

        debug!(memory_id = %memory.id, entry_id = %memory.source_entry_id, "Saved memory");
        Ok(())
    }

    fn load_all_memories(&self) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {} FROM memories ORDER BY extracted_at DESC, id",
                MEMORY_COLUMNS
            ),
            [],
        )
    }

    fn memories_for_entry(&self, entry_id: &Uuid) -> Result<Vec<Memory>> {
        self.query_memories(
            &format!(
                "SELECT {} FROM memories WHERE source_entry_id = ?1 ORDER BY extracted_at DESC, id",
                MEMORY_COLUMNS
            ),
            [entry_id.to_string()],
        )
    }

    fn delete_memory_by_id(&self, id: &Uuid) -> Result<bool> {
        let conn = self.lock_conn()?;
        let removed = conn
            .execute("DELETE FROM memories WHERE id = ?1", [id.to_string()])
            .map_err(JournalError::delete("delete memory"))?;
        debug!(memory_id = %id, removed, "Deleted memory");
        Ok(removed > 0)
    }

    fn clear_all_memories(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let removed = conn
            .execute("DELETE FROM memories", [])
            .map_err(JournalError::delete("clear memories"))?;
        info!(removed, "Cleared memories");
        Ok(removed)
    }

    fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<Memory>> {
        // SQLite's LIKE folds ASCII only, so matching happens on this side.
        let query = Query::new(query);
        let memories = self.query_memories(
            &format!(
                "SELECT {} FROM memories ORDER BY extracted_at DESC, id",
                MEMORY_COLUMNS
            ),
            [],
        )?;
        Ok(memories
            .into_iter()
            .filter(|memory| query.matches_text(&memory.content))
            .take(limit)
            .collect())
    }

    fn check_integrity(&self) -> Result<IntegrityReport> {
        let (rows, mut report) = {
            let conn = self.lock_conn()?;
            let mut stmt = conn
                .prepare("PRAGMA foreign_key_check")
                .map_err(JournalError::statement("prepare foreign key check"))?;
            let mut violations = 0usize;
            let mut fk_rows = stmt
                .query([])
                .map_err(JournalError::read("foreign key check"))?;
            while fk_rows
                .next()
                .map_err(JournalError::read("foreign key check row"))?
                .is_some()
            {
                violations += 1;
            }
            drop(fk_rows);

            let report = IntegrityReport {
                schema_version: schema::schema_version(&conn)?,
                entries: Self::count_rows(&conn, "entries")?,
                memories: Self::count_rows(&conn, "memories")?,
                foreign_key_violations: violations,
                unreadable_entries: Vec::new(),
            };
            drop(stmt);
            drop(conn);
            (
                self.entry_rows(&format!("SELECT {} FROM entries", ENTRY_COLUMNS), [])?,
                report,
            )
        };

        for row in rows {
            let id = row.entry_id().unwrap_or_else(|_| Uuid::nil());
            if let Err(err) = row.decrypt(&self.key) {
                warn!(entry_id = %id, error = %err, "Entry is unreadable");
                report.unreadable_entries.push(id);
            }
        }

        if report.is_ok() {
            info!(entries = report.entries, memories = report.memories, "Integrity check passed");
        } else {
            warn!(
                foreign_key_violations = report.foreign_key_violations,
                unreadable = report.unreadable_entries.len(),
                "Integrity check found problems"
            );
        }
        Ok(report)
    }
}

impl std::fmt::Debug for SqliteJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteJournal")
            .field("path", &self.path)
            .field("schema", &self.schema)
            .field("recovered", &self.recovered)
            .finish_non_exhaustive()
    }
}
