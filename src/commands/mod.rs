/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes four command modules:

- `weather`: Show or refresh the cached weather
- `widget`: Widget refresher, once or periodically
- `chat`: Record and list chat messages
- `history`: Export, import and clear the chat history

Every handler receives an [`AppContext`] holding the stores opened once at
startup.
*/

use crate::config::Config;
use crate::error::Result;
use crate::preferences::PreferenceStore;
use crate::storage::SqliteStorage;
use crate::transfer::ChatHistoryTransfer;
use crate::weather::{build_location_source, OpenWeatherClient, WeatherCachePolicy};
use std::sync::Arc;

pub mod history;
pub mod weather;
pub mod widget;

/// Stores and configuration shared by every command
#[derive(Clone)]
pub struct AppContext {
    /// Effective configuration
    pub config: Config,
    /// Chat message store
    pub storage: SqliteStorage,
    /// Preference store holding the weather cache
    pub preferences: PreferenceStore,
}

impl AppContext {
    /// Open both stores under the configured data directory
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be resolved or either store
    /// cannot be opened
    pub fn open(config: Config) -> Result<Self> {
        let database_path = config.storage.database_path()?;
        let preferences_path = config.storage.preferences_path()?;
        tracing::debug!(
            "Opening stores: database={}, preferences={}",
            database_path.display(),
            preferences_path.display()
        );

        let storage = SqliteStorage::new_with_path(database_path)?;
        let preferences = PreferenceStore::open(preferences_path)?;
        Ok(Self {
            config,
            storage,
            preferences,
        })
    }

    /// Build the weather cache policy from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or a client cannot be built
    pub fn weather_policy(&self) -> Result<WeatherCachePolicy> {
        self.config.validate_for_refresh()?;
        let fetcher = OpenWeatherClient::new(&self.config.weather)?;
        let location = build_location_source(&self.config.location, &self.config.weather)?;
        Ok(WeatherCachePolicy::new(
            self.preferences.clone(),
            location,
            Arc::new(fetcher),
            &self.config.weather,
        ))
    }

    /// Chat history transfer over the message store
    pub fn transfer(&self) -> ChatHistoryTransfer {
        ChatHistoryTransfer::new(self.storage.clone())
    }
}

/// Chat command(s)
///
/// Records messages from either side of the conversation and prints the
/// most recent part of the log.
pub mod chat {
    use super::AppContext;
    use crate::cli::ChatCommand;
    use crate::error::Result;
    use crate::storage::{ChatMessage, Sender};
    use chrono::{Local, TimeZone};
    use colored::Colorize;
    use prettytable::{format, Table};

    /// Handle chat commands
    pub fn handle_chat(ctx: &AppContext, command: ChatCommand) -> Result<()> {
        match command {
            ChatCommand::Send { text } => record(ctx, ChatMessage::user(text)),
            ChatCommand::Reply { text } => record(ctx, ChatMessage::companion(text)),
            ChatCommand::Log { limit } => print_log(ctx, limit),
        }
    }

    fn record(ctx: &AppContext, message: ChatMessage) -> Result<()> {
        if message.text.trim().is_empty() {
            println!("{}", "Refusing to store an empty message.".yellow());
            return Ok(());
        }
        ctx.storage.insert(&message)?;
        tracing::debug!("Stored message {} from {}", message.id, message.sender);
        println!(
            "{} {}",
            format!("{}:", message.sender.display_name()).bold(),
            message.text
        );
        Ok(())
    }

    /// The newest `limit` messages, newest first
    pub fn recent_messages(ctx: &AppContext, limit: usize) -> Result<Vec<ChatMessage>> {
        let mut messages = ctx.storage.list_all_descending()?;
        messages.truncate(limit);
        Ok(messages)
    }

    fn print_log(ctx: &AppContext, limit: usize) -> Result<()> {
        let messages = recent_messages(ctx, limit)?;
        if messages.is_empty() {
            println!("{}", "No messages yet.".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        for message in messages {
            let time = Local
                .timestamp_millis_opt(message.timestamp)
                .single()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            let sender = match message.sender {
                Sender::User => message.sender.display_name().cyan(),
                Sender::Companion => message.sender.display_name().magenta(),
            };
            table.add_row(prettytable::row![time.dimmed(), sender.bold(), message.text]);
        }
        table.printstd();
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::config::Config;
        use crate::test_utils::temp_dir;

        fn context(dir: &tempfile::TempDir) -> AppContext {
            let mut config = Config::default();
            config.storage.data_dir = Some(dir.path().to_path_buf());
            AppContext::open(config).unwrap()
        }

        #[test]
        fn test_send_and_reply_are_stored_in_order() {
            let dir = temp_dir();
            let ctx = context(&dir);
            ctx.storage
                .insert(&ChatMessage {
                    id: "1".into(),
                    timestamp: 1,
                    sender: Sender::User,
                    text: "Hai".into(),
                })
                .unwrap();
            ctx.storage
                .insert(&ChatMessage {
                    id: "2".into(),
                    timestamp: 2,
                    sender: Sender::Companion,
                    text: "Halo!".into(),
                })
                .unwrap();
            ctx.storage
                .insert(&ChatMessage {
                    id: "3".into(),
                    timestamp: 3,
                    sender: Sender::User,
                    text: "Apa kabar?".into(),
                })
                .unwrap();

            let recent = recent_messages(&ctx, 2).unwrap();
            let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
            assert_eq!(ids, vec!["3", "2"]);
        }

        #[test]
        fn test_empty_message_is_not_stored() {
            let dir = temp_dir();
            let ctx = context(&dir);
            handle_chat(
                &ctx,
                ChatCommand::Send {
                    text: "   ".to_string(),
                },
            )
            .unwrap();
            assert_eq!(ctx.storage.count().unwrap(), 0);
        }

        #[test]
        fn test_reply_is_from_companion() {
            let dir = temp_dir();
            let ctx = context(&dir);
            handle_chat(
                &ctx,
                ChatCommand::Reply {
                    text: "Selamat pagi".to_string(),
                },
            )
            .unwrap();
            let all = ctx.storage.list_all_ascending().unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].sender, Sender::Companion);
        }
    }
}
