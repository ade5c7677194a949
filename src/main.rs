//! lectern CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use lectern::{
    commands::{
        cmd_ask, cmd_clear, cmd_ingest, cmd_init, cmd_search, cmd_status, print_ingest_stats,
        print_query_outcome, print_search_results, print_status,
    },
    config::Config,
    engine::RagEngine,
    error::Result,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(version, about = "Course-materials question answering with tool-driven retrieval", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize lectern configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Ingest a folder of course documents into the index
    Ingest {
        /// Path to a directory of .txt course documents
        path: PathBuf,

        /// Clear the index before ingesting
        #[arg(long)]
        clear: bool,
    },

    /// Ask a question (the model decides whether to search)
    Ask {
        /// The question to answer
        question: String,

        /// Session id for conversation history
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Search course content directly, bypassing the model
    Search {
        /// The search query
        query: String,

        /// Filter to a course (fuzzy title match)
        #[arg(long)]
        course: Option<String>,

        /// Filter to a lesson number
        #[arg(long)]
        lesson: Option<i64>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show index status
    Status,

    /// Delete all indexed data
    Clear,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Handle completions command (doesn't need config or engine)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "lectern", &mut std::io::stdout());
        return Ok(());
    }

    // Handle init command (doesn't need an engine)
    if let Commands::Init { force } = cli.command {
        let base_dir = cli.config.as_deref().and_then(|p| p.parent()).map(PathBuf::from);
        let path = cmd_init(base_dir, force).await?;
        println!("✓ lectern initialized successfully");
        println!("  Config: {}", path.display());
        println!("\nNext steps:");
        println!("  1. Edit the config file to customize settings");
        println!("  2. Ingest courses: lectern ingest /path/to/docs");
        println!("  3. Ask away: lectern ask \"What does lesson 1 cover?\"");
        return Ok(());
    }

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_from(None)?,
    };

    // Open the engine
    let engine = RagEngine::open(config).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Ingest { path, clear } => {
            let stats = cmd_ingest(&engine, &path, clear).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Ask { question, session } => {
            let outcome = cmd_ask(&engine, &question, session.as_deref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_query_outcome(&outcome);
            }
        }

        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            let results = cmd_search(&engine, &query, course.as_deref(), lesson, limit).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_search_results(&results);
            }
        }

        Commands::Status => {
            let status = cmd_status(&engine).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Clear => {
            cmd_clear(&engine).await?;
            println!("✓ Index cleared");
        }
    }

    Ok(())
}
