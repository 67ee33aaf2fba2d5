//! Slot persistence.
//!
//! Results survive process restarts through two named slots in a local
//! SQLite database: one for the scraped incidents, one for the merged
//! summaries. Each save replaces the slot wholesale; partial updates do not
//! exist at this layer.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::errors::StorageError;

/// Slot holding the scraped incident result rows.
pub const INCIDENTS_SLOT: &str = "incidents";
/// Slot holding the result rows with summaries merged in.
pub const SUMMARIES_SLOT: &str = "summaries";

/// Named-slot store backed by SQLite.
pub struct SlotStore {
    pool: SqlitePool,
}

impl SlotStore {
    /// Opens (creating if necessary) the store at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Filesystem path of the SQLite database file
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(_) => info!("Results database created at {}", path.display()),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Results database already exists at {}", path.display())
            }
            Err(e) => return Err(StorageError::Sql(sqlx::Error::Io(e))),
        }

        let pool = SqlitePool::connect(&format!("sqlite:{}", path.display())).await?;

        // Enable WAL mode
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        Self::create_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens an in-memory store; used by tests and disposable runs.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::create_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Creates the 'slots' table if it doesn't exist.
    async fn create_table(pool: &SqlitePool) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS slots (
            name TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Serializes `value` and replaces the slot's payload.
    pub async fn save<T: Serialize>(&self, slot: &str, value: &T) -> Result<(), StorageError> {
        let payload = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO slots (name, payload, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET payload = excluded.payload,
                                             updated_at = excluded.updated_at",
        )
        .bind(slot)
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads and deserializes the slot's payload; `None` when the slot was
    /// never saved or has been cleared.
    pub async fn load<T: DeserializeOwned>(&self, slot: &str) -> Result<Option<T>, StorageError> {
        let row = sqlx::query("SELECT payload FROM slots WHERE name = ?")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    /// Removes the slot. Clearing an absent slot is a no-op.
    pub async fn clear(&self, slot: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM slots WHERE name = ?")
            .bind(slot)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Clears both persisted slots, returning the store to its fresh state.
    pub async fn reset(&self) -> Result<(), StorageError> {
        self.clear(INCIDENTS_SLOT).await?;
        self.clear(SUMMARIES_SLOT).await
    }
}
