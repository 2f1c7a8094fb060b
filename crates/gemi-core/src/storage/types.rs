//! Core data types for the storage layer.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JournalError;

/// A diary entry.
///
/// `content` is the only encrypted field; everything else is low-sensitivity
/// metadata used for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier, assigned at creation
    pub id: Uuid,

    /// Short plaintext label (may be empty)
    pub title: String,

    /// Entry body; sealed before it reaches storage
    pub content: String,

    /// When this entry was created
    pub created_at: DateTime<Utc>,

    /// Last content change
    pub modified_at: DateTime<Utc>,

    pub is_favorite: bool,

    pub mood: Option<Mood>,

    /// Ordered, duplicate-free labels
    pub tags: Vec<String>,

    pub location: Option<String>,

    pub weather: Option<String>,
}

impl JournalEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            modified_at: now,
            is_favorite: false,
            mood: None,
            tags: Vec::new(),
            location: None,
            weather: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather = Some(weather.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        let created_at = created_at.trunc_subsecs(3);
        self.created_at = created_at;
        self.modified_at = created_at;
        self
    }

    /// Replace the body and bump `modified_at`.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalize_tags(tags.into_iter().map(Into::into));
        self.touch();
    }

    fn touch(&mut self) {
        self.modified_at = now().max(self.created_at);
    }
}

/// A fact extracted from a journal entry by the memory-extraction process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,

    /// Short derived summary (not raw entry text)
    pub content: String,

    /// The entry this fact was derived from
    pub source_entry_id: Uuid,

    pub extracted_at: DateTime<Utc>,
}

impl Memory {
    pub fn new(content: impl Into<String>, source_entry_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            source_entry_id,
            extracted_at: now(),
        }
    }

    pub fn with_extracted_at(mut self, extracted_at: DateTime<Utc>) -> Self {
        self.extracted_at = extracted_at.trunc_subsecs(3);
        self
    }
}

/// The closed set of moods an entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Calm,
    Sad,
    Anxious,
    Excited,
    Grateful,
    Angry,
    Tired,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 9] = [
        Mood::Happy,
        Mood::Calm,
        Mood::Sad,
        Mood::Anxious,
        Mood::Excited,
        Mood::Grateful,
        Mood::Angry,
        Mood::Tired,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Calm => "calm",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Excited => "excited",
            Mood::Grateful => "grateful",
            Mood::Angry => "angry",
            Mood::Tired => "tired",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = JournalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == wanted)
            .ok_or_else(|| JournalError::CorruptRow(format!("Unknown mood: {}", value)))
    }
}

/// Which field of an entry satisfied a search, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Title,
    Content,
    Tags,
    Mood,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Title => "title",
            MatchField::Content => "content",
            MatchField::Tags => "tags",
            MatchField::Mood => "mood",
        }
    }
}

/// One entry returned by a detailed search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub entry: JournalEntry,
    /// The highest-precedence field that matched
    pub matched: MatchField,
}

/// Result of `check_integrity`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub schema_version: i64,
    pub entries: usize,
    pub memories: usize,
    /// Memories whose source entry is missing
    pub foreign_key_violations: usize,
    /// Entries that failed to decrypt or decode
    pub unreadable_entries: Vec<Uuid>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.foreign_key_violations == 0 && self.unreadable_entries.is_empty()
    }
}

/// Trim labels, drop empty ones, and remove duplicates keeping the first occurrence.
pub fn normalize_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Current time at the millisecond precision the database stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
