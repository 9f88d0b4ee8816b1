//! Math Tutor CLI
//!
//! Main entry point for the mathtutor command-line tool.
//! Builds the knowledge base and answers math questions with retrieval-augmented generation.

mod commands;
mod services;

use clap::{Parser, Subcommand};
use commands::{AskCommand, CheckCommand, IngestCommand, RetrieveCommand, StatusCommand};
use mathtutor_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Math Tutor - answers math questions from a curated knowledge base
#[derive(Parser, Debug)]
#[command(name = "mathtutor")]
#[command(about = "Answers math questions from a curated knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MATHTUTOR_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MATHTUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the knowledge base index from the corpus
    Ingest(IngestCommand),

    /// Ask a math question
    Ask(AskCommand),

    /// Show raw index hits for a query
    Retrieve(RetrieveCommand),

    /// Show the knowledge base collection
    Status(StatusCommand),

    /// Verify the language model credential
    Check(CheckCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // .env must be in place before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?;
    let config = config.with_overrides(cli.log_level, cli.verbose, cli.no_color, cli.log_json);

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Math Tutor CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("LLM: {} ({})", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Index: {} collection '{}'",
        config.index.backend,
        config.index.collection
    );

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Retrieve(_) => "retrieve",
        Commands::Status(_) => "status",
        Commands::Check(_) => "check",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Check(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
