//! Row types for database queries.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::crypto::{decrypt, JournalKey};
use crate::error::{JournalError, Result};
use crate::storage::types::{JournalEntry, Memory, Mood};

/// Column list matching `EntryRow::from_row`.
pub const ENTRY_COLUMNS: &str = "id, title, content, created_at, modified_at, is_favorite, mood, tags, location, weather";

/// Column list matching `MemoryRow::from_row`.
pub const MEMORY_COLUMNS: &str = "id, content, source_entry_id, extracted_at";

/// Fixed-width RFC 3339 so that lexical order equals time order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| JournalError::CorruptRow(format!("Invalid timestamp {:?}: {}", value, e)))?
        .with_timezone(&Utc))
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| JournalError::CorruptRow(format!("Invalid {} UUID: {}", column, e)))
}

/// Raw row data from the entries table, content still sealed.
#[derive(Debug)]
pub struct EntryRow {
    pub id: String,
    pub title: String,
    pub content: Vec<u8>,
    pub created_at: String,
    pub modified_at: String,
    pub is_favorite: bool,
    pub mood: Option<String>,
    pub tags_json: String,
    pub location: Option<String>,
    pub weather: Option<String>,
}

impl EntryRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            modified_at: row.get(4)?,
            is_favorite: row.get(5)?,
            mood: row.get(6)?,
            tags_json: row.get(7)?,
            location: row.get(8)?,
            weather: row.get(9)?,
        })
    }

    /// Parse the entry id without touching the sealed content.
    pub fn entry_id(&self) -> Result<Uuid> {
        parse_uuid(&self.id, "entry")
    }

    /// Decrypt the content and parse the remaining columns.
    pub fn decrypt(self, key: &JournalKey) -> Result<JournalEntry> {
        let id = self.entry_id()?;
        let content = decrypt(&self.content, key)
            .map_err(|e| JournalError::Decryption(format!("entry {}: {}", id, e)))?;
        let mood = self.mood.as_deref().map(str::parse::<Mood>).transpose()?;
        let tags: Vec<String> = serde_json::from_str(&self.tags_json)
            .map_err(|e| JournalError::CorruptRow(format!("Invalid tags JSON: {}", e)))?;

        Ok(JournalEntry {
            id,
            title: self.title,
            content,
            created_at: parse_timestamp(&self.created_at)?,
            modified_at: parse_timestamp(&self.modified_at)?,
            is_favorite: self.is_favorite,
            mood,
            tags,
            location: self.location,
            weather: self.weather,
        })
    }
}

/// Raw row data from the memories table.
#[derive(Debug)]
pub struct MemoryRow {
    pub id: String,
    pub content: String,
    pub source_entry_id: String,
    pub extracted_at: String,
}

impl MemoryRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            source_entry_id: row.get(2)?,
            extracted_at: row.get(3)?,
        })
    }
}

impl TryFrom<MemoryRow> for Memory {
    type Error = JournalError;

    fn try_from(row: MemoryRow) -> Result<Self> {
        Ok(Memory {
            id: parse_uuid(&row.id, "memory")?,
            content: row.content,
            source_entry_id: parse_uuid(&row.source_entry_id, "source entry")?,
            extracted_at: parse_timestamp(&row.extracted_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);

        let early_str = format_timestamp(&early);
        let late_str = format_timestamp(&late);
        assert_eq!(early_str, "2024-01-02T03:04:05.000Z");
        assert_eq!(early_str.len(), late_str.len());
        assert!(early_str < late_str);
        assert_eq!(parse_timestamp(&late_str).unwrap(), late);
    }

    #[test]
    fn test_invalid_memory_row() {
        let row = MemoryRow {
            id: "nope".to_string(),
            content: "likes tea".to_string(),
            source_entry_id: Uuid::new_v4().to_string(),
            extracted_at: format_timestamp(&Utc::now()),
        };
        assert!(matches!(
            Memory::try_from(row),
            Err(JournalError::CorruptRow(_))
        ));
    }
}
