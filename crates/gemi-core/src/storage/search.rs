//! Case-insensitive substring search over decrypted entries.
//!
//! Entry bodies are encrypted at rest, so no predicate over `content` can be
//! pushed into SQLite. Search loads and decrypts every entry, then filters in
//! memory: cost is O(total entries) regardless of how many match.

use crate::storage::types::{JournalEntry, MatchField, SearchHit};

/// A lowercased needle, ready to test against entries.
#[derive(Debug, Clone)]
pub struct Query {
    needle: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.trim().to_lowercase(),
        }
    }

    /// Empty and whitespace-only queries match every entry.
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches_text(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }

    /// The highest-precedence field of `entry` containing the needle:
    /// title, then content, then tags, then mood.
    pub fn match_field(&self, entry: &JournalEntry) -> Option<MatchField> {
        if self.is_empty() || self.matches_text(&entry.title) {
            return Some(MatchField::Title);
        }
        if self.matches_text(&entry.content) {
            return Some(MatchField::Content);
        }
        if entry.tags.iter().any(|tag| self.matches_text(tag)) {
            return Some(MatchField::Tags);
        }
        if entry
            .mood
            .is_some_and(|mood| self.matches_text(mood.as_str()))
        {
            return Some(MatchField::Mood);
        }
        None
    }
}

/// Filter `entries`, keeping their order.
pub fn search_hits(entries: Vec<JournalEntry>, query: &Query) -> Vec<SearchHit> {
    entries
        .into_iter()
        .filter_map(|entry| {
            query
                .match_field(&entry)
                .map(|matched| SearchHit { entry, matched })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::Mood;

    fn sample() -> Vec<JournalEntry> {
        vec![
            JournalEntry::new("Trip to Rome", "saw the Colosseum").with_tags(["travel"]),
            JournalEntry::new("Quiet day", "stayed home").with_mood(Mood::Calm),
            JournalEntry::new("Groceries", "milk, eggs").with_tags(["errands", "Home-Life"]),
        ]
    }

    fn titles(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.entry.title.as_str()).collect()
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let hits = search_hits(sample(), &Query::new("rome"));
        assert_eq!(titles(&hits), vec!["Trip to Rome"]);
        assert_eq!(hits[0].matched, MatchField::Title);
    }

    #[test]
    fn test_content_and_tag_matches_keep_order() {
        let hits = search_hits(sample(), &Query::new("HOME"));
        assert_eq!(titles(&hits), vec!["Quiet day", "Groceries"]);
        assert_eq!(hits[0].matched, MatchField::Content);
        assert_eq!(hits[1].matched, MatchField::Tags);
    }

    #[test]
    fn test_tag_only_match() {
        let hits = search_hits(sample(), &Query::new("travel"));
        assert_eq!(titles(&hits), vec!["Trip to Rome"]);
        assert_eq!(hits[0].matched, MatchField::Tags);
    }

    #[test]
    fn test_mood_match() {
        let hits = search_hits(sample(), &Query::new("calm"));
        assert_eq!(titles(&hits), vec!["Quiet day"]);
        assert_eq!(hits[0].matched, MatchField::Mood);
    }

    #[test]
    fn test_title_outranks_content() {
        let entry = JournalEntry::new("Rome notes", "more about Rome");
        assert_eq!(Query::new("rome").match_field(&entry), Some(MatchField::Title));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert_eq!(search_hits(sample(), &Query::new("   ")).len(), 3);
    }

    #[test]
    fn test_no_match() {
        assert!(search_hits(sample(), &Query::new("paris")).is_empty());
    }
}
