use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::engine::{Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "tablescope")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and manage persisted tablescope sessions", long_about = None)]
pub struct Cli {
    /// Session file location (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sources recorded in the persisted session
    Sources,
    /// Show recently opened source identifiers
    History,
    /// Forget the persisted source list and recent history
    ClearHistory,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let engine = Engine::new(EngineConfig {
        session_path: cli.session,
        ..EngineConfig::default()
    })?;

    match &cli.command {
        Some(Commands::Sources) => {
            show_sources(&engine);
        }
        Some(Commands::History) => {
            show_history(&engine);
        }
        Some(Commands::ClearHistory) => {
            engine.clear_history()?;
            println!("History cleared");
        }
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn show_sources(engine: &Engine) {
    let session = engine.restore_session();
    if session.sources.is_empty() {
        println!("No sources in session");
        return;
    }
    println!("Persisted sources");
    println!("=================");
    for source in &session.sources {
        println!(
            "{} [{}] - {} table(s), last accessed {}",
            source.display_name,
            source.kind.label(),
            source.tables.len(),
            source.last_accessed.format("%Y-%m-%d %H:%M:%S"),
        );
        for table in &source.tables {
            println!("  {table}");
        }
    }
}

fn show_history(engine: &Engine) {
    let session = engine.restore_session();
    if session.recent_ids.is_empty() {
        println!("No recently opened sources");
        return;
    }
    println!("Recently opened");
    println!("===============");
    for id in &session.recent_ids {
        println!("{id}");
    }
}
