//! Chat repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Database;

/// One conversation thread, owned by a single user identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub repo_url: Option<String>,
    /// Environment-snapshot id assigned once a sandbox has been prepared
    pub snapshot_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ChatRepository {
    db: Database,
}

impl ChatRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the store reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a new chat
    pub async fn create(
        &self,
        owner_id: &str,
        title: String,
        repo_url: Option<String>,
    ) -> Result<Chat> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let chat = Chat {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            title,
            repo_url,
            snapshot_id: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO chats (id, owner_id, title, repo_url, snapshot_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                chat.id,
                chat.owner_id,
                chat.title,
                chat.repo_url,
                chat.snapshot_id,
                chat.created_at.to_rfc3339(),
                chat.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert chat")?;

        tracing::debug!("Created chat: {}", id);
        Ok(chat)
    }

    /// Get a chat by ID
    pub async fn get(&self, id: &str) -> Result<Option<Chat>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, repo_url, snapshot_id, created_at, updated_at
             FROM chats WHERE id = ?1",
        )?;

        let result = stmt.query_row(params![id], Self::map_row);

        match result {
            Ok(chat) => Ok(Some(chat)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to get chat"),
        }
    }

    /// List a user's chats, most recently updated first
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Chat>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, title, repo_url, snapshot_id, created_at, updated_at
             FROM chats WHERE owner_id = ?1 ORDER BY updated_at DESC",
        )?;

        let chats = stmt
            .query_map(params![owner_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect chats")?;

        Ok(chats)
    }

    /// Rename a chat
    pub async fn update_title(&self, id: &str, title: &str) -> Result<()> {
        let conn = self.db.lock().await;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE chats SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now, id],
        )?;

        tracing::debug!("Renamed chat {} to {:?}", id, title);
        Ok(())
    }

    /// Record the environment-snapshot id returned by the sandbox service
    pub async fn set_snapshot_id(&self, id: &str, snapshot_id: &str) -> Result<()> {
        let conn = self.db.lock().await;

        conn.execute(
            "UPDATE chats SET snapshot_id = ?1 WHERE id = ?2",
            params![snapshot_id, id],
        )?;

        tracing::debug!("Stored snapshot {} for chat {}", snapshot_id, id);
        Ok(())
    }

    /// Delete a chat and, via the cascade, its messages.
    /// Store capability only: no command on the CLI surface reaches this.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM chats WHERE id = ?1", params![id])?;
        tracing::debug!("Deleted chat: {}", id);
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Chat> {
        Ok(Chat {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            repo_url: row.get(3)?,
            snapshot_id: row.get(4)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(5)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            updated_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(6)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
