//! Message repository
//!
//! Messages are append-only: nothing here updates or deletes a row.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::feed::{MessageEvent, MessageFeed};
use crate::store::Database;

/// One utterance within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Marks an agent tool step; rendering then reads `metadata.tool_data`
    pub is_tool_use: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a new message with a fresh id and timestamp
    pub fn new(chat_id: &str, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role,
            content: content.into(),
            is_tool_use: false,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_tool_use(mut self) -> Self {
        self.is_tool_use = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            _ => anyhow::bail!("Unknown message role: {}", s),
        }
    }
}

pub struct MessageRepository {
    db: Database,
    feed: MessageFeed,
}

impl MessageRepository {
    pub fn new(db: Database, feed: MessageFeed) -> Self {
        Self { db, feed }
    }

    /// Get the store reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Insert a prebuilt message, bump the owning chat's update timestamp,
    /// and publish the insertion on the feed.
    pub async fn insert(&self, message: &Message) -> Result<()> {
        let metadata = serde_json::to_string(&message.metadata)
            .context("Failed to encode message metadata")?;

        {
            let conn = self.db.lock().await;
            conn.execute(
                "INSERT INTO messages (id, chat_id, role, content, is_tool_use, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.chat_id,
                    message.role.as_str(),
                    message.content,
                    message.is_tool_use,
                    metadata,
                    message.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert message")?;

            // updated_at never moves backwards
            conn.execute(
                "UPDATE chats SET updated_at = MAX(updated_at, ?1) WHERE id = ?2",
                params![Utc::now().to_rfc3339(), message.chat_id],
            )
            .context("Failed to bump chat timestamp")?;
        }

        tracing::debug!("Created message {} in chat {}", message.id, message.chat_id);
        self.feed.publish(MessageEvent::Inserted(message.clone()));
        Ok(())
    }

    /// Build and insert a message in one step
    pub async fn create(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Message> {
        let message = Message::new(chat_id, role, content);
        self.insert(&message).await?;
        Ok(message)
    }

    /// All messages of a conversation, oldest first
    pub async fn list_for_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, role, content, is_tool_use, metadata, created_at
             FROM messages WHERE chat_id = ?1 ORDER BY created_at ASC",
        )?;

        let messages = stmt
            .query_map(params![chat_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect messages")?;

        Ok(messages)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let metadata = row
            .get::<_, Option<String>>(5)?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| serde_json::json!({}));

        Ok(Message {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            role: MessageRole::from_str(&row.get::<_, String>(2).unwrap_or_default())
                .unwrap_or(MessageRole::System),
            content: row.get(3)?,
            is_tool_use: row.get(4)?,
            metadata,
            created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(6).unwrap_or_default())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
