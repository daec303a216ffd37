use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversation tag stored with every row; the transfer document omits it
pub const DEFAULT_CONVERSATION_ID: &str = "default_conversation";

/// Who wrote a chat message
///
/// Serialized as the uppercase tags used in exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    /// The person using the app
    #[serde(rename = "USER")]
    User,
    /// The companion persona
    #[serde(rename = "ELYSIA")]
    Companion,
}

impl Sender {
    /// Wire/storage tag for this sender
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "USER",
            Sender::Companion => "ELYSIA",
        }
    }

    /// Human-facing name for listings
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Companion => "Elysia",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Sender::User),
            "ELYSIA" => Ok(Sender::Companion),
            other => Err(format!("unknown sender tag: {}", other)),
        }
    }
}

impl ToSql for Sender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Sender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// A single chat message
///
/// Messages are immutable once created; `timestamp` (milliseconds since the
/// Unix epoch) is the only sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Globally unique identifier
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Author of the message
    pub sender: Sender,
    /// Message content
    pub text: String,
}

impl ChatMessage {
    /// Create a message with a fresh id and the current time
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            sender,
            text: text.into(),
        }
    }

    /// Create a message written by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create a message written by the companion
    pub fn companion(text: impl Into<String>) -> Self {
        Self::new(Sender::Companion, text)
    }
}

/// Transfer envelope for a full chat history export
///
/// Unknown fields are ignored when reading, so documents written by newer
/// versions still import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryDocument {
    /// Messages in ascending timestamp order
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_serializes_to_tags() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"USER\"");
        assert_eq!(
            serde_json::to_string(&Sender::Companion).unwrap(),
            "\"ELYSIA\""
        );
    }

    #[test]
    fn test_sender_from_str_rejects_unknown() {
        assert_eq!("USER".parse::<Sender>(), Ok(Sender::User));
        assert_eq!("ELYSIA".parse::<Sender>(), Ok(Sender::Companion));
        assert!("user".parse::<Sender>().is_err());
    }

    #[test]
    fn test_new_messages_have_unique_ids() {
        let a = ChatMessage::user("hi");
        let b = ChatMessage::user("hi");
        assert_ne!(a.id, b.id);
        assert_eq!(a.sender, Sender::User);
        assert!(a.timestamp > 0);
    }

    #[test]
    fn test_document_ignores_unknown_fields() {
        let json = r#"{
            "version": 2,
            "messages": [
                {"id": "m1", "timestamp": 5, "sender": "ELYSIA", "text": "Halo", "read": true}
            ]
        }"#;
        let doc: ChatHistoryDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.messages.len(), 1);
        assert_eq!(doc.messages[0].sender, Sender::Companion);
    }
}
