//! Schema creation and forward-only migration.
//!
//! `setup` is idempotent. It runs once per process, before the engine accepts
//! any operation, inside a single transaction:
//!
//! 1. ensure `entries` exists, adding optional columns older builds lacked;
//! 2. detect the `memories` layout once and dispatch to its migration;
//! 3. ensure the listing indexes;
//! 4. stamp `PRAGMA user_version`.
//!
//! The `memories` table changed shape across releases: the first layout named
//! the source column `entry_id`, the current one `source_entry_id` with a
//! cascading foreign key onto `entries`.

use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{JournalError, Result};
use crate::storage::sqlite::row::format_timestamp;

/// Schema version stamped into `PRAGMA user_version` after setup.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

const CREATE_ENTRIES: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL DEFAULT '',
        content BLOB NOT NULL,
        created_at TEXT NOT NULL,
        modified_at TEXT NOT NULL,
        is_favorite INTEGER NOT NULL DEFAULT 0,
        mood TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        location TEXT,
        weather TEXT
    );
"#;

/// Entry columns every layout has had.
const ENTRY_REQUIRED_COLUMNS: [&str; 5] = ["id", "title", "content", "created_at", "modified_at"];

/// Entry columns added after the first release, with their definitions.
const ENTRY_ADDED_COLUMNS: [(&str, &str); 5] = [
    ("is_favorite", "is_favorite INTEGER NOT NULL DEFAULT 0"),
    ("mood", "mood TEXT"),
    ("tags", "tags TEXT NOT NULL DEFAULT '[]'"),
    ("location", "location TEXT"),
    ("weather", "weather TEXT"),
];

const CREATE_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries (created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_entries_favorite ON entries (is_favorite, created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_memories_extracted_at ON memories (extracted_at DESC);
    CREATE INDEX IF NOT EXISTS idx_memories_source ON memories (source_entry_id);
"#;

const LEGACY_SOURCE_COLUMN: &str = "entry_id";
const CURRENT_SOURCE_COLUMN: &str = "source_entry_id";
const LEGACY_TIMESTAMP_COLUMNS: [&str; 3] = ["extracted_at", "created_at", "timestamp"];

fn create_memories_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE {table} (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            source_entry_id TEXT NOT NULL REFERENCES entries (id) ON DELETE CASCADE,
            extracted_at TEXT NOT NULL
        );
        "#
    )
}

/// The `memories` layout found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum MemoriesLayout {
    /// No table yet.
    Missing,
    /// First release: source column `entry_id`, optional timestamp column.
    Legacy {
        timestamp_column: Option<&'static str>,
    },
    /// Neither source column present (empty or damaged table).
    Unrecognized,
    Current,
}

impl MemoriesLayout {
    /// Classify a `memories` table by its column names.
    pub fn detect(columns: &[String]) -> Self {
        let has = |name: &str| columns.iter().any(|column| column.eq_ignore_ascii_case(name));
        if columns.is_empty() {
            MemoriesLayout::Missing
        } else if has(CURRENT_SOURCE_COLUMN) {
            MemoriesLayout::Current
        } else if has(LEGACY_SOURCE_COLUMN) {
            MemoriesLayout::Legacy {
                timestamp_column: LEGACY_TIMESTAMP_COLUMNS.into_iter().find(|name| has(name)),
            }
        } else {
            MemoriesLayout::Unrecognized
        }
    }
}

/// What `setup` found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// `user_version` before setup ran
    pub previous_version: i64,
    pub memories_layout: MemoriesLayout,
    /// Memory rows copied into the current layout
    pub migrated_memories: usize,
    /// Memory rows discarded (dangling, or in an unrecognized table)
    pub dropped_memories: usize,
    /// Entry columns added to an older `entries` table
    pub added_entry_columns: Vec<String>,
}

fn schema_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> JournalError {
    move |err| JournalError::Schema(format!("{}: {}", context, err))
}

/// Per-connection settings: busy timeout, WAL, and foreign key enforcement.
///
/// Setting the journal mode is the first statement that reads the file, so
/// an unreadable or non-SQLite file fails here.
pub fn prepare_connection(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(schema_err("set busy timeout"))?;
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(schema_err("enable WAL"))?;
    if !mode.eq_ignore_ascii_case("wal") && !mode.eq_ignore_ascii_case("memory") {
        warn!(mode = %mode, "SQLite refused WAL journal mode");
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(schema_err("enable foreign keys"))?;
    Ok(())
}

/// Create or migrate the schema to `CURRENT_SCHEMA_VERSION`.
pub fn setup(conn: &mut Connection) -> Result<SchemaReport> {
    let tx = conn.transaction().map_err(schema_err("begin setup"))?;

    let previous_version: i64 = tx
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(schema_err("read user_version"))?;

    let added_entry_columns = ensure_entries(&tx)?;

    let memories_layout = MemoriesLayout::detect(&table_columns(&tx, "memories")?);
    let (migrated_memories, dropped_memories) = match memories_layout {
        MemoriesLayout::Missing => {
            create_memories(&tx)?;
            (0, 0)
        }
        MemoriesLayout::Legacy { timestamp_column } => migrate_legacy_memories(&tx, timestamp_column)?,
        MemoriesLayout::Unrecognized => (0, recreate_memories(&tx)?),
        MemoriesLayout::Current => (0, 0),
    };

    tx.execute_batch(CREATE_INDEXES)
        .map_err(schema_err("create indexes"))?;
    if previous_version != CURRENT_SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
            .map_err(schema_err("write user_version"))?;
    }
    tx.commit().map_err(schema_err("commit setup"))?;

    let report = SchemaReport {
        previous_version,
        memories_layout,
        migrated_memories,
        dropped_memories,
        added_entry_columns,
    };
    debug!(?report, "Schema ready");
    Ok(report)
}

/// Read `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(schema_err("read user_version"))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(schema_err("inspect table"))?;
    let rows = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(schema_err("inspect table"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(schema_err("inspect table"))
}

fn ensure_entries(tx: &Transaction<'_>) -> Result<Vec<String>> {
    tx.execute_batch(CREATE_ENTRIES)
        .map_err(schema_err("create entries"))?;

    let columns = table_columns(tx, "entries")?;
    let has = |name: &str| columns.iter().any(|column| column.eq_ignore_ascii_case(name));

    if let Some(missing) = ENTRY_REQUIRED_COLUMNS.iter().find(|name| !has(name)) {
        return Err(JournalError::Schema(format!(
            "entries table is missing required column {}",
            missing
        )));
    }

    let mut added = Vec::new();
    for (name, definition) in ENTRY_ADDED_COLUMNS {
        if !has(name) {
            tx.execute_batch(&format!("ALTER TABLE entries ADD COLUMN {};", definition))
                .map_err(schema_err("add entries column"))?;
            info!(column = name, "Added missing entries column");
            added.push(name.to_string());
        }
    }
    Ok(added)
}

fn create_memories(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(&create_memories_sql("memories"))
        .map_err(schema_err("create memories"))
}

/// Drop a table that has neither source column and start over.
fn recreate_memories(tx: &Transaction<'_>) -> Result<usize> {
    let discarded: i64 = tx
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .map_err(schema_err("count unrecognized memories"))?;
    tx.execute_batch("DROP TABLE memories;")
        .map_err(schema_err("drop unrecognized memories"))?;
    create_memories(tx)?;
    warn!(discarded, "Recreated memories table with unrecognized layout");
    Ok(discarded as usize)
}

struct LegacyMemory {
    id: String,
    content: Option<String>,
    entry_id: Option<String>,
    timestamp: Value,
}

/// Copy the legacy table into the current layout, then swap tables.
///
/// Rows whose source entry no longer exists are dropped: the new table
/// enforces the foreign key, and a dangling memory is never valid.
fn migrate_legacy_memories(
    tx: &Transaction<'_>,
    timestamp_column: Option<&'static str>,
) -> Result<(usize, usize)> {
    let now = Utc::now();
    let select = match timestamp_column {
        Some(column) => format!("SELECT id, content, entry_id, {} FROM memories", column),
        None => "SELECT id, content, entry_id, NULL FROM memories".to_string(),
    };

    let legacy = {
        let mut stmt = tx.prepare(&select).map_err(schema_err("read legacy memories"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LegacyMemory {
                    id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    content: row.get(1)?,
                    entry_id: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })
            .map_err(schema_err("read legacy memories"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(schema_err("read legacy memories"))?
    };

    tx.execute_batch("DROP TABLE IF EXISTS memories_v2;")
        .map_err(schema_err("clear staging table"))?;
    tx.execute_batch(&create_memories_sql("memories_v2"))
        .map_err(schema_err("create staging table"))?;

    let mut migrated = 0;
    let mut dropped = 0;
    {
        let mut entry_exists = tx
            .prepare("SELECT 1 FROM entries WHERE id = ?1")
            .map_err(schema_err("prepare entry lookup"))?;
        let mut insert = tx
            .prepare(
                "INSERT OR IGNORE INTO memories_v2 (id, content, source_entry_id, extracted_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(schema_err("prepare memory copy"))?;

        for row in legacy {
            let (Some(content), Some(entry_id)) = (row.content, row.entry_id) else {
                dropped += 1;
                continue;
            };
            let source_exists = entry_exists
                .query_row([&entry_id], |_| Ok(()))
                .optional()
                .map_err(schema_err("look up source entry"))?
                .is_some();
            if !source_exists {
                dropped += 1;
                continue;
            }

            let id = match Uuid::parse_str(&row.id) {
                Ok(id) => id,
                Err(_) => Uuid::new_v4(),
            };
            let extracted_at = legacy_timestamp(&row.timestamp).unwrap_or(now);
            let inserted = insert
                .execute((id.to_string(), content, entry_id, format_timestamp(&extracted_at)))
                .map_err(schema_err("copy legacy memory"))?;
            if inserted > 0 {
                migrated += 1;
            } else {
                dropped += 1;
            }
        }
    }

    tx.execute_batch("DROP TABLE memories; ALTER TABLE memories_v2 RENAME TO memories;")
        .map_err(schema_err("swap memories table"))?;

    info!(migrated, dropped, "Migrated legacy memories table");
    Ok((migrated, dropped))
}

/// Integers above this are Unix milliseconds rather than seconds
/// (seconds would put them past the year 2286).
const LEGACY_MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Interpret a legacy timestamp cell: RFC 3339 or SQLite `datetime()` text,
/// or Unix seconds or milliseconds. Anything else, including dates outside
/// years 0000-9999, is treated as missing.
fn legacy_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Text(text) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Integer(raw) if raw.unsigned_abs() > LEGACY_MILLIS_THRESHOLD as u64 => {
            Utc.timestamp_millis_opt(*raw).single()
        }
        Value::Integer(seconds) => Utc.timestamp_opt(*seconds, 0).single(),
        Value::Real(raw) if raw.abs() > LEGACY_MILLIS_THRESHOLD as f64 => {
            Utc.timestamp_millis_opt(*raw as i64).single()
        }
        Value::Real(seconds) => Utc.timestamp_millis_opt((*seconds * 1000.0) as i64).single(),
        Value::Null | Value::Blob(_) => None,
    }?;
    (0..=9999).contains(&parsed.year()).then_some(parsed)
}
