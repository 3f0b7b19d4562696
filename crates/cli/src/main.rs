// Chronicle CLI
//
// Thin shell over the engine: start a session, send follow-up messages,
// resume processing, inspect a stream, list recent sessions. All state lives
// in the store; the CLI only renders it.
//
// Exit codes: 0 on success, 1 on engine/store failures (via anyhow), 2 on
// argument errors (clap's default).

mod commands;
mod config;
mod output;
mod telemetry;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use chronicle_core::tools::builtin_registry;
use chronicle_engine::Engine;
use chronicle_llm::create_client;
use chronicle_store::MessageDbStore;

use crate::config::AppConfig;
use crate::output::ShowFormat;

#[derive(Parser)]
#[command(name = "chronicle")]
#[command(about = "Event-sourced agent sessions over Message DB")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session with an initial message and process it
    Start {
        /// The first user message
        message: String,
    },

    /// Add a message to an existing session and process it
    Message {
        /// Thread id of the session
        thread_id: String,
        /// The user message text
        text: String,
    },

    /// Resume processing of an existing session
    Continue {
        /// Thread id of the session
        thread_id: String,
    },

    /// Show the events of a session
    Show {
        /// Thread id of the session
        thread_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: ShowFormat,
        /// Include full event data and metadata
        #[arg(long)]
        full: bool,
    },

    /// List recent sessions
    List {
        /// Maximum number of sessions to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config.log_level, &config.log_format);

    let store = Arc::new(MessageDbStore::connect(&config.store).await?);

    match cli.command {
        Commands::Start { message } => {
            let engine = build_engine(store, &config)?;
            commands::start(&engine, &message).await
        }
        Commands::Message { thread_id, text } => {
            let engine = build_engine(store, &config)?;
            commands::message(&engine, &thread_id, &text).await
        }
        Commands::Continue { thread_id } => {
            let engine = build_engine(store, &config)?;
            commands::resume(&engine, &thread_id).await
        }
        Commands::Show {
            thread_id,
            format,
            full,
        } => commands::show(&*store, &config, &thread_id, format, full).await,
        Commands::List { limit } => commands::list(&*store, &config, limit).await,
    }
}

fn build_engine(store: Arc<MessageDbStore>, config: &AppConfig) -> anyhow::Result<Engine> {
    let llm = create_client(&config.llm)?;
    Ok(Engine::new(
        store,
        llm,
        Arc::new(builtin_registry()),
        config.engine.clone(),
    ))
}
