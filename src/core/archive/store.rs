//! Video Store
//!
//! SQLite-backed persistence for video records. The connection is wrapped in
//! a mutex so the store can be shared across the coordinator's worker tasks.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::core::{CoreError, CoreResult, VideoId};

use super::{VideoMetadata, VideoRecord};

// =============================================================================
// Video Store
// =============================================================================

/// SQLite store for video records
pub struct VideoStore {
    conn: Mutex<Connection>,
}

impl VideoStore {
    /// Opens (or creates) a store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::DatabaseError(format!("Failed to open video store: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store (for testing)
    pub fn in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CoreError::DatabaseError(format!("Failed to create in-memory store: {}", e))
        })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CoreResult<()> {
        self.lock()?
            .execute_batch(
                r#"
                -- Videos table: one row per indexed video
                CREATE TABLE IF NOT EXISTS videos (
                    id TEXT PRIMARY KEY,
                    path TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL,
                    transcript TEXT NOT NULL DEFAULT '',
                    metadata TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_videos_path ON videos(path);
                "#,
            )
            .map_err(|e| CoreError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> CoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Internal("video store mutex poisoned".to_string()))
    }

    /// Inserts or replaces a record (same id = re-processed video)
    pub fn save(&self, record: &VideoRecord) -> CoreResult<()> {
        let metadata = serde_json::to_string(&record.metadata)?;
        self.lock()?
            .execute(
                r#"
                INSERT INTO videos (id, path, description, transcript, metadata, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    path = excluded.path,
                    description = excluded.description,
                    transcript = excluded.transcript,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at
                "#,
                params![
                    record.id,
                    record.path,
                    record.description,
                    record.transcript,
                    metadata,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| CoreError::DatabaseError(format!("Failed to save video: {}", e)))?;

        debug!("Saved video record {}", record.id);
        Ok(())
    }

    /// Loads a record by id
    pub fn get(&self, id: &str) -> CoreResult<Option<VideoRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, path, description, transcript, metadata, created_at, updated_at
                 FROM videos WHERE id = ?1",
                [id],
                row_to_record,
            )
            .optional()
            .map_err(|e| CoreError::DatabaseError(format!("Failed to load video: {}", e)))?;

        Ok(record)
    }

    /// Loads a record by id, erroring when missing
    pub fn require(&self, id: &str) -> CoreResult<VideoRecord> {
        self.get(id)?
            .ok_or_else(|| CoreError::VideoNotFound(id.to_string()))
    }

    /// Loads all records, ordered by path
    pub fn all(&self) -> CoreResult<Vec<VideoRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, path, description, transcript, metadata, created_at, updated_at
                 FROM videos ORDER BY path",
            )
            .map_err(|e| CoreError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| CoreError::DatabaseError(format!("Failed to query videos: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(
                row.map_err(|e| CoreError::DatabaseError(format!("Failed to read row: {}", e)))?,
            );
        }
        Ok(records)
    }

    /// Updates the star rating on an existing record
    pub fn set_rating(&self, id: &VideoId, rating: u8) -> CoreResult<()> {
        if rating > 5 {
            return Err(CoreError::ValidationError(format!(
                "rating must be 0-5, got {}",
                rating
            )));
        }

        let mut record = self.require(id)?;
        record.metadata.rating = rating;
        record.updated_at = chrono::Utc::now();
        self.save(&record)
    }

    /// Deletes a record
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        let changed = self
            .lock()?
            .execute("DELETE FROM videos WHERE id = ?1", [id])
            .map_err(|e| CoreError::DatabaseError(format!("Failed to delete video: {}", e)))?;

        if changed == 0 {
            return Err(CoreError::VideoNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Number of stored records
    pub fn count(&self) -> CoreResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))
            .map_err(|e| CoreError::DatabaseError(format!("Failed to count videos: {}", e)))?;

        Ok(count as usize)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<VideoRecord> {
    let metadata_json: String = row.get(4)?;
    let metadata: VideoMetadata = serde_json::from_str(&metadata_json).unwrap_or_default();
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(VideoRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        description: row.get(2)?,
        transcript: row.get(3)?,
        metadata,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn parse_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}
