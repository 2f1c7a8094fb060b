//! Gemi CLI - local maintenance tool for the encrypted journal
//!
//! This binary is the composition root: it loads config, sets up logging,
//! and builds the key manager and storage engine that the core library
//! exposes. It is a thin consumer of `gemi-core`.

mod app;
mod cli;
mod commands;
mod helpers;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::{hint_for, AppContext};
use crate::cli::{Cli, Commands};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gemi_core={0},gemi={0}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::new(cli)?;
    match &cli.command {
        Commands::Add(args) => commands::handle_add(&ctx, args).await,
        Commands::List(args) => commands::handle_list(&ctx, args).await,
        Commands::Show(args) => commands::handle_show(&ctx, args).await,
        Commands::Search(args) => commands::handle_search(&ctx, args).await,
        Commands::Delete(args) => commands::handle_delete(&ctx, args).await,
        Commands::Memories { command } => commands::handle_memories(&ctx, command).await,
        Commands::Check => commands::handle_check(&ctx).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli).await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = hint_for(&err) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}
