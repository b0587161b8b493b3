//! StyleBot application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Load the knowledge directory and build the knowledge index
//! 3. Build the agent (classifier, index, design engine, provider)
//! 4. Run the requested front end: chat REPL, one-shot ask, or HTTP API

mod cli;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use stylebot_api::state::AppState;
use stylebot_chat::response::suggestion_title;
use stylebot_chat::{Agent, ChatError};
use stylebot_core::config::StyleBotConfig;
use stylebot_core::types::{ChatReply, SessionId};
use stylebot_knowledge::{
    embedder_from_config, ChunkingConfig, KnowledgeBase, KnowledgeIndex, SharedKnowledgeIndex,
};

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

const TRENDING_COUNT: usize = 5;

const REPL_HELP: &str = "\
Commands:
  help      show this message
  stats     statistics for this session
  clear     forget this session's history
  trending  popular design ideas right now
  reload    re-read the knowledge directory
  quit      leave (also: exit)
Anything else is sent to StyleBot.";

/// Load the config file when present; a present but invalid file is fatal.
fn load_config(path: &Path) -> AppResult<StyleBotConfig> {
    if path.exists() {
        Ok(StyleBotConfig::load(path)?)
    } else {
        Ok(StyleBotConfig::default())
    }
}

/// Load the knowledge directory, index it and assemble the agent.
async fn build_agent(config: StyleBotConfig, knowledge_dir: &Path) -> AppResult<Agent> {
    let KnowledgeBase { documents, catalog } = KnowledgeBase::load_dir(knowledge_dir)?;

    let embedder = embedder_from_config(&config.retrieval)?;
    let index = KnowledgeIndex::build(
        &documents,
        embedder,
        ChunkingConfig::from(&config.retrieval),
    )
    .await?;
    tracing::info!(
        documents = index.document_count(),
        chunks = index.len(),
        "Knowledge index built"
    );

    let agent = Agent::builder(config)
        .index(Arc::new(SharedKnowledgeIndex::new(index)))
        .catalog(Arc::new(catalog))
        .build()?;
    Ok(agent)
}

fn print_reply(reply: &ChatReply) {
    println!("\nstylebot> {}", reply.response_text);
    if !reply.source_labels.is_empty() {
        println!("          (sources: {})", reply.source_labels.join(", "));
    }
    println!();
}

/// Rebuild the index from disk and swap it in. The catalog is fixed at
/// startup; only its documents are re-indexed.
async fn reload_knowledge(agent: &Agent, knowledge_dir: &Path) -> AppResult<u64> {
    let kb = KnowledgeBase::load_dir(knowledge_dir)?;
    let chunking = ChunkingConfig::from(&agent.config().retrieval);
    Ok(agent.knowledge().rebuild(&kb.documents, chunking).await?)
}

/// Interactive read-eval-print loop over stdin.
async fn run_repl(agent: &Agent, session_id: SessionId, knowledge_dir: &Path) -> AppResult<()> {
    println!("StyleBot v{} - ask about products, orders or designs.", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => println!("{}\n", REPL_HELP),
            "stats" => match agent.stats(&session_id) {
                Ok(stats) => println!(
                    "Session {}: {} messages, {} turns retained, {} active suggestions, {}s elapsed\n",
                    stats.session_id,
                    stats.interaction_count,
                    stats.retained_turns,
                    stats.active_suggestions,
                    stats.duration_secs
                ),
                Err(ChatError::SessionNotFound(_)) => println!("No messages yet.\n"),
                Err(e) => println!("Could not read stats: {}\n", e),
            },
            "clear" => match agent.clear_history(&session_id) {
                Ok(()) | Err(ChatError::SessionNotFound(_)) => println!("History cleared.\n"),
                Err(e) => println!("Could not clear history: {}\n", e),
            },
            "trending" => {
                let suggestions = agent.trending(TRENDING_COUNT);
                if suggestions.is_empty() {
                    println!("Design suggestions are turned off.\n");
                }
                for (i, s) in suggestions.iter().enumerate() {
                    println!("{}. {}\n   {}", i + 1, suggestion_title(s), s.description);
                }
                println!();
            }
            "reload" => match reload_knowledge(agent, knowledge_dir).await {
                Ok(version) => println!("Knowledge reloaded (version {}).\n", version),
                Err(e) => {
                    tracing::warn!(error = %e, "Knowledge reload failed");
                    println!("Reload failed, keeping the current knowledge: {}\n", e);
                }
            },
            _ => {
                let reply = agent.handle_message(&session_id, input).await;
                print_reply(&reply);
            }
        }
    }

    if let Err(e) = agent.end_session(&session_id) {
        tracing::debug!(error = %e, "Session ended before any message");
    }
    println!("Goodbye!");
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = load_config(&config_file)?;
    config.server.port = args.resolve_port(config.server.port);
    let knowledge_dir: PathBuf = args.resolve_knowledge_dir(&config.general.knowledge_dir);

    // Tracing. RUST_LOG wins over the configured level; logs go to stderr
    // so they never interleave with chat output.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting StyleBot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        found = config_file.exists(),
        "Configuration resolved"
    );

    let agent = build_agent(config, &knowledge_dir).await?;

    match args.command() {
        Command::Chat { session } => {
            let session_id = session.map(SessionId::from).unwrap_or_default();
            run_repl(&agent, session_id, &knowledge_dir).await?;
        }
        Command::Ask { json, message } => {
            let reply = agent
                .handle_message(&SessionId::new(), &message.join(" "))
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.response_text);
            }
        }
        Command::Serve { .. } => {
            let port = agent.config().server.port;
            tracing::info!(port, "Serving HTTP API");
            if let Err(e) = stylebot_api::start_server(AppState::new(agent)).await {
                tracing::error!(error = %e, "API server stopped");
                tracing::error!("Try: STYLEBOT_PORT={} stylebot serve", port.saturating_add(1));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
