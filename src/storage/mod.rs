use crate::error::{ElysiaError, Result};
use anyhow::Context;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

pub mod types;
pub use types::{ChatHistoryDocument, ChatMessage, Sender, DEFAULT_CONVERSATION_ID};

/// How long a connection waits for another writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, timestamp, sender, text FROM chat_messages";

/// Storage backend for chat messages
///
/// The handle is cheap to clone; clones share the change notifier so an
/// observer sees writes made through any of them.
#[derive(Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteStorage {
    /// Create a new storage instance that uses the specified database path.
    ///
    /// The parent directory is created when missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use elysia::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("chat.db")).unwrap();
    /// assert_eq!(storage.count().unwrap(), 0);
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ElysiaError::Storage(e.to_string()))?;
        }

        let (changes, _) = watch::channel(0u64);
        let storage = Self {
            db_path,
            changes: Arc::new(changes),
        };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                sender TEXT NOT NULL,
                text TEXT NOT NULL,
                conversation_id TEXT NOT NULL DEFAULT 'default_conversation'
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_timestamp
                ON chat_messages (timestamp);",
        )
        .context("Failed to create tables")
        .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        Ok(())
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    /// Insert a message, replacing any row with the same id
    pub fn insert(&self, message: &ChatMessage) -> Result<()> {
        tracing::debug!("Saving message id: {}", message.id);
        let conn = self.open()?;
        insert_row(&conn, message)?;
        self.notify();
        Ok(())
    }

    /// Insert many messages in one transaction
    pub fn insert_all(&self, messages: &[ChatMessage]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        for message in messages {
            insert_row(&tx, message)?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        tracing::info!("Saved {} messages", messages.len());
        self.notify();
        Ok(())
    }

    /// Replace the whole history in one transaction
    ///
    /// Readers on other connections see either the old history or the new
    /// one, never the empty store in between.
    pub fn replace_all(&self, messages: &[ChatMessage]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        tx.execute("DELETE FROM chat_messages", [])
            .context("Failed to clear messages")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        for message in messages {
            insert_row(&tx, message)?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        tracing::info!("Replaced history with {} messages", messages.len());
        self.notify();
        Ok(())
    }

    /// All messages, oldest first; equal timestamps keep insertion order
    pub fn list_all_ascending(&self) -> Result<Vec<ChatMessage>> {
        self.query(&format!("{} ORDER BY timestamp ASC, rowid ASC", SELECT_COLUMNS))
    }

    /// All messages, newest first; equal timestamps newest insertion first
    pub fn list_all_descending(&self) -> Result<Vec<ChatMessage>> {
        self.query(&format!(
            "{} ORDER BY timestamp DESC, rowid DESC",
            SELECT_COLUMNS
        ))
    }

    fn query(&self, sql: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(sql)
            .context("Failed to prepare statement")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], map_row)
            .context("Failed to query messages")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for row in rows {
            let message = row
                .context("Failed to read message row")
                .map_err(|e| ElysiaError::Storage(e.to_string()))?;
            messages.push(message);
        }
        Ok(messages)
    }

    /// Observe the history, newest first
    ///
    /// The stream yields the current contents immediately and again after
    /// every write made through this handle or its clones.
    pub fn observe_all(&self) -> impl Stream<Item = Vec<ChatMessage>> + Send + 'static {
        let storage = self.clone();
        WatchStream::new(self.changes.subscribe()).filter_map(move |_| {
            match storage.list_all_descending() {
                Ok(messages) => Some(messages),
                Err(e) => {
                    tracing::warn!("Failed to read messages for observer: {}", e);
                    None
                }
            }
        })
    }

    /// Delete every message
    pub fn clear(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM chat_messages", [])
            .context("Failed to clear messages")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;
        tracing::info!("Cleared chat history");
        self.notify();
        Ok(())
    }

    /// Number of stored messages
    pub fn count(&self) -> Result<usize> {
        let conn = self.open()?;
        let count: i64 = conn
            .query_row("SELECT count(*) FROM chat_messages", [], |r| r.get(0))
            .context("Failed to count messages")
            .map_err(|e| ElysiaError::Storage(e.to_string()))?;
        Ok(count as usize)
    }
}

fn insert_row(conn: &Connection, message: &ChatMessage) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO chat_messages (id, timestamp, sender, text, conversation_id)
        VALUES (?, ?, ?, ?, ?)",
        params![
            message.id,
            message.timestamp,
            message.sender,
            message.text,
            DEFAULT_CONVERSATION_ID
        ],
    )
    .context("Failed to insert message")
    .map_err(|e| ElysiaError::Storage(e.to_string()))?;
    Ok(())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        sender: row.get(2)?,
        text: row.get(3)?,
    })
}
