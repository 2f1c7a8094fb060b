use std::path::Path;
use std::sync::Arc;

use gemi_core::config::KeyStoreBackend;
use gemi_core::storage::{MemoriesLayout, CURRENT_SCHEMA_VERSION};
use gemi_core::{JournalEntry, JournalStorage, Memory, StorageConfig};
use rusqlite::Connection;
use tempfile::tempdir;

fn file_config(dir: &Path) -> StorageConfig {
    let mut config = StorageConfig::at_dir(dir);
    config.key_store.backend = KeyStoreBackend::Keyfile;
    config
}

async fn open(config: &StorageConfig) -> JournalStorage {
    let keys = Arc::new(config.key_manager().expect("key manager should build"));
    let storage = JournalStorage::new(config.clone(), keys);
    storage
        .initialize()
        .await
        .expect("initialize should succeed");
    storage
}

/// Replace the memories table with the first-release layout.
fn install_legacy_memories(db: &Path, rows: &[(&str, &str, &str, &str)]) {
    let conn = Connection::open(db).expect("open raw database");
    conn.execute_batch(
        "DROP TABLE memories;
         CREATE TABLE memories (
             id TEXT PRIMARY KEY,
             content TEXT NOT NULL,
             entry_id TEXT NOT NULL,
             created_at TEXT
         );
         PRAGMA user_version = 1;",
    )
    .expect("install legacy table");
    for row in rows {
        conn.execute(
            "INSERT INTO memories (id, content, entry_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            [row.0, row.1, row.2, row.3],
        )
        .expect("insert legacy row");
    }
}

#[tokio::test]
async fn test_legacy_memories_migrate_on_startup() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let entry = JournalEntry::new("Hike", "went up the ridge");
    {
        let storage = open(&config).await;
        storage.save_entry(&entry).await.unwrap();
    }

    let kept = uuid::Uuid::new_v4().to_string();
    let orphan = uuid::Uuid::new_v4().to_string();
    let missing_entry = uuid::Uuid::new_v4().to_string();
    let entry_id = entry.id.to_string();
    install_legacy_memories(
        &dir.path().join("journal.sqlite"),
        &[
            (kept.as_str(), "enjoys hiking", entry_id.as_str(), "2023-05-06 07:08:09"),
            (orphan.as_str(), "lost fact", missing_entry.as_str(), "2023-05-06 07:08:09"),
        ],
    );

    let storage = open(&config).await;
    let report = storage.schema_report().unwrap();
    assert_eq!(report.previous_version, 1);
    assert_eq!(
        report.memories_layout,
        MemoriesLayout::Legacy {
            timestamp_column: Some("created_at")
        }
    );
    assert_eq!(report.migrated_memories, 1);
    assert_eq!(report.dropped_memories, 1);

    let memories = storage.memories_for_entry(entry.id).await.unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].id.to_string(), kept);
    assert_eq!(
        memories[0].extracted_at.to_rfc3339(),
        "2023-05-06T07:08:09+00:00"
    );

    // Migrated rows follow the entry on delete.
    assert!(storage.delete_entry(entry.id).await.unwrap());
    assert!(storage.load_all_memories().await.unwrap().is_empty());

    let integrity = storage.check_integrity().await.unwrap();
    assert_eq!(integrity.schema_version, CURRENT_SCHEMA_VERSION);
    assert!(integrity.is_ok());
}

#[tokio::test]
async fn test_restart_on_current_schema_changes_nothing() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let entry = JournalEntry::new("", "x");
    {
        let storage = open(&config).await;
        storage.save_entry(&entry).await.unwrap();
        storage
            .save_memory(&Memory::new("a fact", entry.id))
            .await
            .unwrap();
    }

    let storage = open(&config).await;
    let report = storage.schema_report().unwrap();
    assert_eq!(report.previous_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.memories_layout, MemoriesLayout::Current);
    assert_eq!(report.migrated_memories, 0);
    assert_eq!(report.dropped_memories, 0);
    assert!(report.added_entry_columns.is_empty());
    assert_eq!(storage.load_all_memories().await.unwrap().len(), 1);
}
