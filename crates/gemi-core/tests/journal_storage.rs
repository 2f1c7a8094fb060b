use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use gemi_core::config::KeyStoreBackend;
use gemi_core::fs::database_files;
use gemi_core::{JournalEntry, JournalError, JournalStorage, Memory, Mood, StorageConfig};
use tempfile::tempdir;

const MARKER: &str = "unmistakable-plaintext-marker-7731";

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

fn database_bytes(dir: &Path) -> Vec<u8> {
    database_files(&dir.join("journal.sqlite"))
        .into_iter()
        .filter_map(|path| fs::read(path).ok())
        .flatten()
        .collect()
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[tokio::test]
async fn test_round_trip_across_restart() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());

    let entry = JournalEntry::new("Trip to Rome", "saw the Colosseum")
        .with_tags(["travel", "italy"])
        .with_mood(Mood::Grateful)
        .with_favorite(true)
        .with_weather("sunny");
    {
        let storage = open(&config).await;
        storage.save_entry(&entry).await.expect("save should succeed");
        storage
            .save_memory(&Memory::new("has been to Rome", entry.id))
            .await
            .expect("save memory should succeed");
    }

    let storage = open(&config).await;
    let entries = storage.load_all_entries().await.expect("load should succeed");
    assert_eq!(entries, vec![entry.clone()]);
    assert_eq!(
        storage
            .load_favorite_entries()
            .await
            .expect("favorites should load")
            .len(),
        1
    );
    assert_eq!(
        storage
            .memories_for_entry(entry.id)
            .await
            .expect("memories should load")[0]
            .content,
        "has been to Rome"
    );
    assert!(!storage.recovered_from_corruption());
}

#[tokio::test]
async fn test_content_never_reaches_disk_in_plaintext() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());

    {
        let storage = open(&config).await;
        let entry = JournalEntry::new("visible title", format!("body with {}", MARKER));
        storage.save_entry(&entry).await.expect("save should succeed");

        let bytes = database_bytes(dir.path());
        assert!(contains(&bytes, "visible title"));
        assert!(!contains(&bytes, MARKER));
    }

    let bytes = database_bytes(dir.path());
    assert!(!bytes.is_empty());
    assert!(!contains(&bytes, MARKER));
}

#[tokio::test]
async fn test_delete_entry_removes_memories_after_restart() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let entry = JournalEntry::new("", "went hiking");
    let other = JournalEntry::new("", "read a book");
    {
        let storage = open(&config).await;
        storage.save_entry(&entry).await.unwrap();
        storage.save_entry(&other).await.unwrap();
        for fact in ["likes hiking", "owns boots"] {
            storage
                .save_memory(&Memory::new(fact, entry.id))
                .await
                .unwrap();
        }
        storage
            .save_memory(&Memory::new("reads novels", other.id))
            .await
            .unwrap();
    }

    let storage = open(&config).await;
    assert!(storage.delete_entry(entry.id).await.unwrap());

    let memories = storage.load_all_memories().await.unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].source_entry_id, other.id);
    assert!(storage.load_entry(entry.id).await.unwrap().is_none());

    let report = storage.check_integrity().await.unwrap();
    assert!(report.is_ok());
    assert_eq!(report.foreign_key_violations, 0);
}

#[tokio::test]
async fn test_memory_for_missing_entry_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let storage = open(&file_config(dir.path())).await;

    let err = storage
        .save_memory(&Memory::new("dangling", uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Write { .. }));
    assert!(err.is_retryable());
    assert!(storage.load_all_memories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_scenarios() {
    let dir = tempdir().expect("tempdir");
    let storage = open(&file_config(dir.path())).await;
    let now = Utc::now();

    let rome = JournalEntry::new("Trip to Rome", "saw the Colosseum")
        .with_created_at(now - Duration::days(3));
    let home = JournalEntry::new("Quiet", "stayed HOME all day")
        .with_created_at(now - Duration::days(2));
    let tagged = JournalEntry::new("Errands", "bought milk")
        .with_tags(["home-life"])
        .with_created_at(now - Duration::days(1));
    for entry in [&rome, &home, &tagged] {
        storage.save_entry(entry).await.unwrap();
    }

    let found = storage.search_entries("rome").await.unwrap();
    assert_eq!(found, vec![rome.clone()]);

    let found = storage.search_entries("home").await.unwrap();
    let ids: Vec<_> = found.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![tagged.id, home.id]);

    assert!(storage.search_entries("paris").await.unwrap().is_empty());
    assert_eq!(storage.search_entries("").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_memories_newest_first_with_limit() {
    let dir = tempdir().expect("tempdir");
    let storage = open(&file_config(dir.path())).await;
    let entry = JournalEntry::new("", "coffee notes");
    storage.save_entry(&entry).await.unwrap();

    let base = Utc::now() - Duration::hours(1);
    for minute in 0..5 {
        let memory = Memory::new(format!("coffee fact {}", minute), entry.id)
            .with_extracted_at(base + Duration::minutes(minute));
        storage.save_memory(&memory).await.unwrap();
    }

    let found = storage.search_memories("COFFEE", 3).await.unwrap();
    let contents: Vec<_> = found.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["coffee fact 4", "coffee fact 3", "coffee fact 2"]);

    assert_eq!(storage.clear_all_memories().await.unwrap(), 5);
    assert_eq!(storage.entry_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_saves_are_serialized() {
    let dir = tempdir().expect("tempdir");
    let storage = Arc::new(open(&file_config(dir.path())).await);

    let mut handles = Vec::new();
    for i in 0..16 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            let entry = JournalEntry::new(format!("entry {}", i), "body");
            storage.save_entry(&entry).await
        }));
    }
    for handle in handles {
        handle.await.expect("task should join").expect("save should succeed");
    }

    assert_eq!(storage.entry_count().await.unwrap(), 16);
}

#[tokio::test]
async fn test_wrong_key_fails_closed() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let entry = JournalEntry::new("", "sealed under the first key");
    {
        let storage = open(&config).await;
        storage.save_entry(&entry).await.unwrap();
    }

    let mut other = config.clone();
    other.key_store.keyfile = Some(dir.path().join("other.key"));
    let storage = open(&other).await;

    let err = storage.load_all_entries().await.unwrap_err();
    assert!(matches!(err, JournalError::Decryption(_)));
    assert!(err.is_data_loss());

    let report = storage.check_integrity().await.unwrap();
    assert_eq!(report.unreadable_entries, vec![entry.id]);
    assert!(!report.is_ok());
}

#[tokio::test]
async fn test_corrupt_database_is_recreated() {
    let dir = tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let db = dir.path().join("journal.sqlite");
    fs::write(&db, vec![0x42u8; 4096]).expect("write garbage");

    let storage = open(&config).await;
    assert!(storage.recovered_from_corruption());
    assert_eq!(storage.entry_count().await.unwrap(), 0);

    storage
        .save_entry(&JournalEntry::new("", "fresh start"))
        .await
        .expect("save should succeed after recovery");
}

#[tokio::test]
async fn test_corrupt_database_kept_when_recovery_disabled() {
    let dir = tempdir().expect("tempdir");
    let mut config = file_config(dir.path());
    config.recover_corrupt_database = false;
    let db = dir.path().join("journal.sqlite");
    let garbage = vec![0x42u8; 4096];
    fs::write(&db, &garbage).expect("write garbage");

    let keys = Arc::new(config.key_manager().unwrap());
    let storage = JournalStorage::new(config, keys);
    let err = storage.initialize().await.unwrap_err();

    assert!(matches!(err, JournalError::Schema(_)));
    assert!(!storage.is_initialized());
    assert_eq!(fs::read(&db).unwrap(), garbage);
}

#[cfg(unix)]
#[tokio::test]
async fn test_database_and_key_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("tempdir");
    let data_dir = dir.path().join("gemi");
    let storage = open(&file_config(&data_dir)).await;
    storage
        .save_entry(&JournalEntry::new("", "private"))
        .await
        .unwrap();

    let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&data_dir), 0o700);
    assert_eq!(mode(&data_dir.join("journal.sqlite")), 0o600);
    assert_eq!(mode(&data_dir.join("journal.key")), 0o600);
}
