use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use gemi_core::VERSION;

/// Gemi - an on-device, encrypted personal journal
#[derive(Parser)]
#[command(name = "gemi")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = "GEMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the journal database (overrides config)
    #[arg(long, global = true, env = "GEMI_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new journal entry
    Add(AddArgs),

    /// List entries, newest first
    List(ListArgs),

    /// Show a specific entry by ID
    Show(ShowArgs),

    /// Search titles, bodies, tags and moods
    Search(SearchArgs),

    /// Delete an entry and every memory derived from it
    Delete(DeleteArgs),

    /// Inspect and manage extracted memories
    Memories {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Check database integrity and that every entry decrypts
    Check,
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    /// Entry title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Entry body (otherwise read from stdin)
    #[arg(long)]
    pub body: Option<String>,

    /// Add tags to the entry
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Mood (happy, calm, sad, anxious, excited, grateful, angry, tired, neutral)
    #[arg(long)]
    pub mood: Option<String>,

    /// Mark as favorite
    #[arg(long)]
    pub favorite: bool,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub weather: Option<String>,

    /// Set custom date/time (ISO-8601 or YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Only favorite entries
    #[arg(long)]
    pub favorites: bool,

    /// Filter by tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Limit number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Entry ID (full UUID or prefix)
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Arguments for the `search` command
#[derive(Args)]
pub struct SearchArgs {
    /// Search query (case-insensitive substring)
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Limit number of results
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    /// Entry ID (full UUID or prefix)
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// List memories, newest first
    List {
        /// Only memories derived from this entry (full UUID or prefix)
        #[arg(long, value_name = "ID")]
        entry: Option<String>,
    },

    /// Record a memory derived from an entry
    Add {
        /// Source entry ID (full UUID or prefix)
        #[arg(value_name = "ENTRY")]
        entry: String,

        /// The extracted fact
        #[arg(value_name = "CONTENT")]
        content: String,
    },

    /// Search memory content
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Delete one memory
    Delete {
        /// Memory ID (full UUID or prefix)
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete every memory (entries are kept)
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}
