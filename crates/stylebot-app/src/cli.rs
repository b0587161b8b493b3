//! CLI argument definitions for the StyleBot application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// StyleBot - a conversational assistant for a custom clothing store.
#[derive(Parser, Debug)]
#[command(name = "stylebot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding knowledge documents and products.json.
    #[arg(short = 'k', long = "knowledge-dir", global = true)]
    pub knowledge_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat session (the default).
    Chat {
        /// Resume or name a session instead of starting a fresh one.
        #[arg(short = 's', long = "session")]
        session: Option<String>,
    },
    /// Run the HTTP API.
    Serve {
        /// API server port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Answer a single message and exit.
    Ask {
        /// Print the full reply as JSON.
        #[arg(long = "json")]
        json: bool,
        /// The message to send.
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

impl CliArgs {
    /// The subcommand to run, `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Chat { session: None })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > STYLEBOT_CONFIG env var > ./stylebot.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("STYLEBOT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("stylebot.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > STYLEBOT_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(Command::Serve { port: Some(p) }) = self.command {
            return p;
        }
        std::env::var("STYLEBOT_PORT")
            .ok()
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Resolve the knowledge directory.
    ///
    /// Priority: --knowledge-dir flag > config file value.
    pub fn resolve_knowledge_dir(&self, config_dir: &str) -> PathBuf {
        self.knowledge_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_dir))
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}
