//! Journal storage: data types, the backend trait, the SQLite backend, and
//! the async facade application code talks to.

mod engine;
pub mod search;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use engine::JournalStorage;
pub use sqlite::schema::{MemoriesLayout, SchemaReport, CURRENT_SCHEMA_VERSION};
pub use sqlite::SqliteJournal;
pub use traits::JournalStore;
pub use types::{IntegrityReport, JournalEntry, MatchField, Memory, Mood, SearchHit};
