//! Chat history export and import
//!
//! The whole history moves as one JSON document, `{"messages": [...]}`, in
//! ascending timestamp order. Import either appends to the existing history
//! (messages with a known id overwrite it) or atomically replaces it.

use crate::error::TransferError;
use crate::storage::{ChatHistoryDocument, SqliteStorage};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

type TransferResult<T> = std::result::Result<T, TransferError>;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferFormat {
    #[default]
    Json,
}

impl TransferFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for spreadsheets, unknown extensions and
    /// paths without one
    pub fn from_path(path: &Path) -> TransferResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(TransferFormat::Json),
            "xlsx" | "xls" => Err(TransferError::UnsupportedFormat(format!(
                "spreadsheet import is not supported ({})",
                path.display()
            ))),
            "" => Err(TransferError::UnsupportedFormat(format!(
                "cannot detect format of {}",
                path.display()
            ))),
            other => Err(TransferError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl FromStr for TransferFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> TransferResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TransferFormat::Json),
            other => Err(TransferError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TransferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferFormat::Json => write!(f, "json"),
        }
    }
}

/// Result of serializing the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Serialized document and the number of messages in it
    Document { bytes: Vec<u8>, count: usize },
    /// Nothing to export
    EmptyHistory,
}

/// One-line status shown to the user after a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Exported { count: usize, destination: String },
    NothingToExport,
    Imported { count: usize, replaced: bool },
    Failed(String),
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Exported { count, destination } => {
                write!(f, "Exported {} messages to {}", count, destination)
            }
            TransferStatus::NothingToExport => write!(f, "No chat history to export"),
            TransferStatus::Imported { count, replaced } => {
                let mode = if *replaced { "replaced history" } else { "appended" };
                write!(f, "Imported {} messages ({})", count, mode)
            }
            TransferStatus::Failed(reason) => write!(f, "Transfer failed: {}", reason),
        }
    }
}

impl From<&TransferError> for TransferStatus {
    fn from(error: &TransferError) -> Self {
        TransferStatus::Failed(error.to_string())
    }
}

/// Moves the chat history in and out of the message store
#[derive(Clone)]
pub struct ChatHistoryTransfer {
    storage: SqliteStorage,
}

impl ChatHistoryTransfer {
    /// Create a transfer bound to `storage`
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Serialize the full history in ascending timestamp order
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the history cannot be read
    ///
    /// # Examples
    ///
    /// ```
    /// use elysia::storage::SqliteStorage;
    /// use elysia::transfer::{ChatHistoryTransfer, ExportOutcome};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("chat.db")).unwrap();
    /// let transfer = ChatHistoryTransfer::new(storage);
    /// assert_eq!(transfer.export().unwrap(), ExportOutcome::EmptyHistory);
    /// ```
    pub fn export(&self) -> TransferResult<ExportOutcome> {
        let messages = self
            .storage
            .list_all_ascending()
            .map_err(|e| TransferError::Storage(e.to_string()))?;

        if messages.is_empty() {
            tracing::info!("Chat history is empty, nothing to export");
            return Ok(ExportOutcome::EmptyHistory);
        }

        let count = messages.len();
        let document = ChatHistoryDocument { messages };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| TransferError::MalformedDocument(e.to_string()))?;

        tracing::debug!("Serialized {} messages ({} bytes)", count, bytes.len());
        Ok(ExportOutcome::Document { bytes, count })
    }

    /// Export the history to a file
    ///
    /// Nothing is written when the history is empty.
    ///
    /// # Errors
    ///
    /// Returns `IoFailure` if the file cannot be written
    pub fn export_to_path(
        &self,
        path: &Path,
        format: TransferFormat,
    ) -> TransferResult<TransferStatus> {
        let TransferFormat::Json = format;
        match self.export()? {
            ExportOutcome::EmptyHistory => Ok(TransferStatus::NothingToExport),
            ExportOutcome::Document { bytes, count } => {
                std::fs::write(path, &bytes).map_err(|e| {
                    tracing::error!("Failed to write export to {}: {}", path.display(), e);
                    TransferError::IoFailure(format!("{}: {}", path.display(), e))
                })?;
                tracing::info!("Exported {} messages to {}", count, path.display());
                Ok(TransferStatus::Exported {
                    count,
                    destination: path.display().to_string(),
                })
            }
        }
    }

    /// Import a serialized document
    ///
    /// With `clear_previous` the existing history is replaced in a single
    /// transaction; otherwise messages are appended.
    ///
    /// # Errors
    ///
    /// Returns `EmptyFile` for blank input and `MalformedDocument` when the
    /// bytes do not parse; the store is untouched in both cases
    pub fn import(&self, bytes: &[u8], clear_previous: bool) -> TransferResult<usize> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TransferError::MalformedDocument(format!("not UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            tracing::warn!("Import rejected: empty document");
            return Err(TransferError::EmptyFile);
        }

        let document: ChatHistoryDocument = serde_json::from_str(text).map_err(|e| {
            tracing::warn!("Import rejected: {}", e);
            TransferError::MalformedDocument(e.to_string())
        })?;
        let count = document.messages.len();

        let written = if clear_previous {
            self.storage.replace_all(&document.messages)
        } else {
            self.storage.insert_all(&document.messages)
        };
        written.map_err(|e| TransferError::Storage(e.to_string()))?;

        tracing::info!(
            "Imported {} messages (clear_previous={})",
            count,
            clear_previous
        );
        Ok(count)
    }

    /// Import a document from a file, detecting the format by extension
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for non-JSON files and `IoFailure` when the
    /// file cannot be read, plus everything [`import`](Self::import) returns
    pub fn import_from_path(&self, path: &Path, clear_previous: bool) -> TransferResult<usize> {
        let TransferFormat::Json = TransferFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            TransferError::IoFailure(format!("{}: {}", path.display(), e))
        })?;
        self.import(&bytes, clear_previous)
    }
}
