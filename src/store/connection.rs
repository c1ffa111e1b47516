//! Store connection management
//!
//! NOTE: This implementation uses synchronous rusqlite with tokio::Mutex.
//! The hosted deployment fronts a Postgres-backed service instead; this
//! handle keeps the same row shapes so the repositories stay unchanged.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::schema::SCHEMA;

pub struct Database {
    /// NOTE: Using synchronous rusqlite with Mutex - this blocks the async
    /// runtime thread during store operations.
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl Database {
    /// Create a new store connection
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {:?}", path))?;

        // Enforce the message -> chat foreign key
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Initialize schema
        conn.execute_batch(SCHEMA)?;

        info!("Conversation store initialized at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Get a locked connection
    ///
    /// WARNING: This holds the mutex for the duration of the operation,
    /// blocking other async tasks from accessing the store.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Get the store path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check if the store is accessible (for health checks)
    pub async fn health_check(&self) -> Result<bool> {
        let conn = self.lock().await;
        match conn.execute("SELECT 1", []) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
        }
    }
}
