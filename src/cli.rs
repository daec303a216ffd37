//! Command-line interface definition for Elysia
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the weather panel, the widget refresher,
//! the chat log and chat history transfer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Elysia - virtual companion chat and weather panel
///
/// Keeps the chat history and the cached weather snapshot on this machine,
/// and moves the history in and out as JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "elysia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the directory holding the chat database and preferences
    #[arg(long, env = "ELYSIA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Elysia
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show or refresh the cached weather
    Weather {
        /// Weather subcommand
        #[command(subcommand)]
        command: WeatherCommand,
    },

    /// Run the widget refresher
    Widget {
        /// Refresh once and exit instead of looping
        #[arg(long)]
        once: bool,
    },

    /// Add to or read the chat log
    Chat {
        /// Chat subcommand
        #[command(subcommand)]
        command: ChatCommand,
    },

    /// Export, import or clear the chat history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Weather subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum WeatherCommand {
    /// Show the cached weather without refreshing
    Show,

    /// Refresh the cached weather if it is stale
    Refresh {
        /// Refresh even if the cache is still fresh
        #[arg(short, long)]
        force: bool,
    },
}

/// Chat subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ChatCommand {
    /// Record a message from you
    Send {
        /// Message text
        text: String,
    },

    /// Record a message from Elysia
    Reply {
        /// Message text
        text: String,
    },

    /// Show the most recent messages
    Log {
        /// Maximum number of messages to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// Export the chat history to a file
    Export {
        /// Destination file
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Import chat history from a file
    Import {
        /// Source file (.json)
        path: PathBuf,

        /// Merge into the existing history instead of replacing it
        #[arg(short, long)]
        append: bool,
    },

    /// Delete all stored messages
    Clear,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            data_dir: None,
            command: Commands::Weather {
                command: WeatherCommand::Show,
            },
        }
    }
}
