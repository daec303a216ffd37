//! Elysia - virtual companion chat and weather panel library
//!
//! This library provides the core of the Elysia companion app: the chat
//! message store, the preference store holding the cached weather snapshot,
//! the weather cache policy, and chat history export/import.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Chat message store on SQLite
//! - `preferences`: Key-value preference store and weather cache
//! - `weather`: Location sources, the weather client and the cache policy
//! - `transfer`: Chat history export and import
//! - `widget`: Background widget refresh
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use elysia::commands::AppContext;
//! use elysia::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let ctx = AppContext::open(config)?;
//!     let view = ctx.weather_policy()?.ensure_fresh().await;
//!     println!("{:?}", view.snapshot());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod preferences;
pub mod storage;
pub mod transfer;
pub mod weather;
pub mod widget;

// Re-export commonly used types
pub use config::Config;
pub use error::{ElysiaError, Result, TransferError, WeatherError};
pub use preferences::PreferenceStore;
pub use storage::{ChatMessage, Sender, SqliteStorage};
pub use transfer::{ChatHistoryTransfer, ExportOutcome};
pub use weather::{WeatherCachePolicy, WeatherSnapshot, WeatherView};

#[cfg(test)]
pub mod test_utils;
