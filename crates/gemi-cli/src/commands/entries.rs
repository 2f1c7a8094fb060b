use gemi_core::JournalEntry;

use crate::app::AppContext;
use crate::cli::{AddArgs, DeleteArgs, ListArgs, SearchArgs, ShowArgs};
use crate::helpers::{parse_datetime, parse_mood, read_entry_body, resolve_entry_id};
use crate::output::{print_entry, print_entry_list, print_json, print_search_hits};

pub async fn handle_add(ctx: &AppContext<'_>, args: &AddArgs) -> anyhow::Result<()> {
    let body = read_entry_body(args.body.clone())?;
    let mut entry = JournalEntry::new(args.title.clone(), body)
        .with_tags(args.tag.iter().cloned())
        .with_favorite(args.favorite);
    if let Some(value) = &args.mood {
        entry = entry.with_mood(parse_mood(value)?);
    }
    if let Some(value) = &args.location {
        entry = entry.with_location(value.clone());
    }
    if let Some(value) = &args.weather {
        entry = entry.with_weather(value.clone());
    }
    if let Some(value) = &args.date {
        entry = entry.with_created_at(parse_datetime(value)?);
    }

    let storage = ctx.open_storage().await?;
    storage.save_entry(&entry).await?;

    if ctx.json() {
        print_json(&serde_json::json!({ "id": entry.id }))?;
    } else if ctx.quiet() {
        println!("{}", entry.id);
    } else {
        println!("Added entry {}", entry.id);
    }
    Ok(())
}

pub async fn handle_list(ctx: &AppContext<'_>, args: &ListArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let mut entries = if args.favorites {
        storage.load_favorite_entries().await?
    } else {
        storage.load_all_entries().await?
    };
    if let Some(tag) = &args.tag {
        let wanted = tag.trim().to_lowercase();
        entries.retain(|entry| entry.tags.iter().any(|t| t.to_lowercase() == wanted));
    }
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }
    print_entry_list(&entries, ctx.json(), ctx.quiet())
}

pub async fn handle_show(ctx: &AppContext<'_>, args: &ShowArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let id = resolve_entry_id(&storage, &args.id).await?;
    let entry = storage
        .load_entry(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Entry not found: {}", id))?;
    let memories = storage.memories_for_entry(id).await?;
    print_entry(&entry, &memories, ctx.json(), ctx.quiet())
}

pub async fn handle_search(ctx: &AppContext<'_>, args: &SearchArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let mut hits = storage.search_entries_detailed(&args.query).await?;
    if let Some(limit) = args.limit {
        hits.truncate(limit);
    }
    print_search_hits(&hits, ctx.json(), ctx.quiet())
}

pub async fn handle_delete(ctx: &AppContext<'_>, args: &DeleteArgs) -> anyhow::Result<()> {
    let storage = ctx.open_storage().await?;
    let id = resolve_entry_id(&storage, &args.id).await?;
    let cascaded = storage.memories_for_entry(id).await?.len();
    if !storage.delete_entry(id).await? {
        return Err(anyhow::anyhow!("Entry not found: {}", id));
    }

    if ctx.json() {
        print_json(&serde_json::json!({ "id": id, "deleted_memories": cascaded }))?;
    } else if !ctx.quiet() {
        println!("Deleted entry {} and {} memories", id, cascaded);
    }
    Ok(())
}
