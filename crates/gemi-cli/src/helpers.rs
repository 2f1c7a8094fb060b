//! Parsing and lookup helpers shared by command handlers.

use std::io::{self, IsTerminal, Read};

use chrono::{DateTime, NaiveDate, Utc};
use gemi_core::{JournalStorage, Mood};
use uuid::Uuid;

/// Shortest ID prefix accepted in place of a full UUID.
const MIN_ID_PREFIX: usize = 4;

/// Parse a datetime string (ISO-8601 or YYYY-MM-DD).
pub fn parse_datetime(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid date value: {}", value))?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    Err(anyhow::anyhow!(
        "Invalid date/time (expected ISO-8601 or YYYY-MM-DD): {}",
        value
    ))
}

pub fn parse_mood(value: &str) -> anyhow::Result<Mood> {
    value.parse::<Mood>().map_err(|_| {
        let choices: Vec<&str> = Mood::ALL.iter().map(|mood| mood.as_str()).collect();
        anyhow::anyhow!("Unknown mood \"{}\" (use one of: {})", value, choices.join(", "))
    })
}

/// Use `--body` if given, otherwise read piped stdin.
pub fn read_entry_body(body: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = body {
        if value.trim().is_empty() {
            return Err(anyhow::anyhow!("--body cannot be empty"));
        }
        return Ok(value);
    }

    if io::stdin().is_terminal() {
        return Err(anyhow::anyhow!(
            "No entry body given; use --body or pipe content via stdin"
        ));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
    let trimmed = buffer.trim_end().to_string();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("No input provided on stdin"));
    }
    Ok(trimmed)
}

/// Match a full UUID or a unique prefix against `candidates`.
pub fn match_id<I>(raw: &str, candidates: I, kind: &str) -> anyhow::Result<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    let raw = raw.trim();
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }
    if raw.len() < MIN_ID_PREFIX {
        return Err(anyhow::anyhow!(
            "{} ID prefix must be at least {} characters",
            kind,
            MIN_ID_PREFIX
        ));
    }

    let prefix = raw.to_lowercase();
    let matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow::anyhow!("{} not found: {}", kind, raw)),
        _ => Err(anyhow::anyhow!(
            "{} ID prefix {} is ambiguous ({} matches)",
            kind,
            raw,
            matches.len()
        )),
    }
}

pub async fn resolve_entry_id(storage: &JournalStorage, raw: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw.trim()) {
        return Ok(id);
    }
    let entries = storage.load_all_entries().await?;
    match_id(raw, entries.into_iter().map(|entry| entry.id), "Entry")
}

pub async fn resolve_memory_id(storage: &JournalStorage, raw: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw.trim()) {
        return Ok(id);
    }
    let memories = storage.load_all_memories().await?;
    match_id(raw, memories.into_iter().map(|memory| memory.id), "Memory")
}
