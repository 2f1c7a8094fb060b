use gemi_core::Memory;

use crate::app::AppContext;
use crate::cli::MemoryCommands;
use crate::helpers::{resolve_entry_id, resolve_memory_id};
use crate::output::{print_json, print_memories};

pub async fn handle_memories(ctx: &AppContext<'_>, command: &MemoryCommands) -> anyhow::Result<()> {
    match command {
        MemoryCommands::List { entry } => {
            let storage = ctx.open_storage().await?;
            let memories = match entry {
                Some(raw) => {
                    let id = resolve_entry_id(&storage, raw).await?;
                    storage.memories_for_entry(id).await?
                }
                None => storage.load_all_memories().await?,
            };
            print_memories(&memories, ctx.json(), ctx.quiet())
        }
        MemoryCommands::Add { entry, content } => {
            if content.trim().is_empty() {
                return Err(anyhow::anyhow!("Memory content cannot be empty"));
            }
            let storage = ctx.open_storage().await?;
            let entry_id = resolve_entry_id(&storage, entry).await?;
            if storage.load_entry(entry_id).await?.is_none() {
                return Err(anyhow::anyhow!("Entry not found: {}", entry_id));
            }
            let memory = Memory::new(content.trim(), entry_id);
            storage.save_memory(&memory).await?;

            if ctx.json() {
                print_json(&serde_json::json!({ "id": memory.id }))
            } else {
                if !ctx.quiet() {
                    println!("Added memory {}", memory.id);
                }
                Ok(())
            }
        }
        MemoryCommands::Search { query, limit } => {
            let storage = ctx.open_storage().await?;
            let memories = storage.search_memories(query, *limit).await?;
            print_memories(&memories, ctx.json(), ctx.quiet())
        }
        MemoryCommands::Delete { id } => {
            let storage = ctx.open_storage().await?;
            let id = resolve_memory_id(&storage, id).await?;
            if !storage.delete_memory_by_id(id).await? {
                return Err(anyhow::anyhow!("Memory not found: {}", id));
            }
            if !ctx.quiet() && !ctx.json() {
                println!("Deleted memory {}", id);
            }
            Ok(())
        }
        MemoryCommands::Clear { yes } => {
            if !yes {
                return Err(anyhow::anyhow!(
                    "Refusing to delete every memory without --yes"
                ));
            }
            let storage = ctx.open_storage().await?;
            let removed = storage.clear_all_memories().await?;
            if ctx.json() {
                print_json(&serde_json::json!({ "deleted_memories": removed }))
            } else {
                if !ctx.quiet() {
                    println!("Deleted {} memories", removed);
                }
                Ok(())
            }
        }
    }
}
