//! Output formatting for entries, memories, and integrity reports.
//!
//! `--json` prints machine-readable values; otherwise tables for lists and
//! a header block for single entries.

use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use gemi_core::storage::SchemaReport;
use gemi_core::{IntegrityReport, JournalEntry, Memory, SearchHit};
use serde::Serialize;

const SUMMARY_WIDTH: usize = 48;

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn format_time(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

/// First line of `text`, cut to `SUMMARY_WIDTH` characters.
fn summary(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > SUMMARY_WIDTH {
        let cut: String = line.chars().take(SUMMARY_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

fn entry_label(entry: &JournalEntry) -> String {
    if entry.title.trim().is_empty() {
        summary(&entry.content)
    } else {
        summary(&entry.title)
    }
}

fn entry_row(entry: &JournalEntry) -> Vec<String> {
    vec![
        short_id(&entry.id),
        format_time(&entry.created_at),
        entry_label(entry),
        entry.tags.join(", "),
        entry.mood.map(|mood| mood.to_string()).unwrap_or_default(),
        if entry.is_favorite { "*" } else { "" }.to_string(),
    ]
}

pub fn print_entry_list(entries: &[JournalEntry], json: bool, quiet: bool) -> anyhow::Result<()> {
    if json {
        return print_json(entries);
    }
    if quiet {
        for entry in entries {
            println!("{}", entry.id);
        }
        return Ok(());
    }
    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    let mut table = table(&["ID", "CREATED", "TITLE", "TAGS", "MOOD", "FAV"]);
    for entry in entries {
        table.add_row(entry_row(entry));
    }
    println!("{}", table);
    Ok(())
}

pub fn print_search_hits(hits: &[SearchHit], json: bool, quiet: bool) -> anyhow::Result<()> {
    if json {
        return print_json(hits);
    }
    if quiet {
        for hit in hits {
            println!("{}", hit.entry.id);
        }
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matching entries.");
        return Ok(());
    }

    let mut table = table(&["ID", "CREATED", "TITLE", "MATCHED"]);
    for hit in hits {
        table.add_row(vec![
            short_id(&hit.entry.id),
            format_time(&hit.entry.created_at),
            entry_label(&hit.entry),
            hit.matched.as_str().to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn print_entry(
    entry: &JournalEntry,
    memories: &[Memory],
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "entry": entry,
            "memories": memories,
        }));
    }

    if !quiet {
        println!("ID: {}", entry.id);
        if !entry.title.is_empty() {
            println!("Title: {}", entry.title);
        }
        println!("Created: {}", entry.created_at.to_rfc3339());
        if entry.modified_at != entry.created_at {
            println!("Modified: {}", entry.modified_at.to_rfc3339());
        }
        if entry.is_favorite {
            println!("Favorite: yes");
        }
        if let Some(mood) = entry.mood {
            println!("Mood: {}", mood);
        }
        if !entry.tags.is_empty() {
            println!("Tags: {}", entry.tags.join(", "));
        }
        if let Some(location) = &entry.location {
            println!("Location: {}", location);
        }
        if let Some(weather) = &entry.weather {
            println!("Weather: {}", weather);
        }
        println!();
    }
    println!("{}", entry.content);

    if !quiet && !memories.is_empty() {
        println!();
        println!("Memories:");
        for memory in memories {
            println!("- {} ({})", memory.content, short_id(&memory.id));
        }
    }
    Ok(())
}

pub fn print_memories(memories: &[Memory], json: bool, quiet: bool) -> anyhow::Result<()> {
    if json {
        return print_json(memories);
    }
    if quiet {
        for memory in memories {
            println!("{}", memory.id);
        }
        return Ok(());
    }
    if memories.is_empty() {
        println!("No memories.");
        return Ok(());
    }

    let mut table = table(&["ID", "EXTRACTED", "ENTRY", "CONTENT"]);
    for memory in memories {
        table.add_row(vec![
            short_id(&memory.id),
            format_time(&memory.extracted_at),
            short_id(&memory.source_entry_id),
            memory.content.clone(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

pub fn print_integrity(
    report: &IntegrityReport,
    schema: &SchemaReport,
    recovered: bool,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "ok": report.is_ok(),
            "integrity": report,
            "schema": schema,
            "recovered_from_corruption": recovered,
        }));
    }

    if report.is_ok() {
        if !quiet {
            println!("Integrity check: OK");
            println!("- schema version: {}", report.schema_version);
            println!("- entries: {} (all decrypt)", report.entries);
            println!("- memories: {}", report.memories);
            println!("- foreign keys: OK");
        }
        return Ok(());
    }

    eprintln!("Integrity check: FAILED");
    if report.foreign_key_violations > 0 {
        eprintln!(
            "- foreign keys: {} memories point at missing entries",
            report.foreign_key_violations
        );
    }
    for id in &report.unreadable_entries {
        eprintln!("- entry {} cannot be decrypted", id);
    }
    Ok(())
}
