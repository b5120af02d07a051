//! Durable geocode cache over `SQLite`.
//!
//! First stop in the resolver waterfall: once any provider resolves a place
//! at high confidence, the answer lands here and survives restarts. Only
//! positive answers are stored. Misses stay request-scoped, so a place that
//! is unresolvable today can still resolve after the next data refresh.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use crate::model::{GeocodeResult, GeocodeSource};

/// Error from the durable cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("creating cache directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS geocode_cache (
    key          TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    latitude     REAL NOT NULL,
    longitude    REAL NOT NULL,
    confidence   REAL NOT NULL,
    source       TEXT NOT NULL,
    hit_count    INTEGER NOT NULL DEFAULT 0,
    created_at   INTEGER NOT NULL,
    last_used_at INTEGER NOT NULL
);
";

/// Persistent key/value store of resolved places.
pub struct GeocodeStore {
    conn: Mutex<Connection>,
}

impl GeocodeStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "opened durable geocode cache");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read one entry, bumping its usage counters.
    ///
    /// Reads come back branded [`GeocodeSource::DurableCache`] no matter
    /// which provider first produced the row; the `source` column keeps the
    /// original provenance for inspection.
    pub fn get(&self, key: &str) -> Result<Option<GeocodeResult>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT name, latitude, longitude, confidence FROM geocode_cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok(GeocodeResult {
                        name: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        confidence: row.get(3)?,
                        source: GeocodeSource::DurableCache,
                    })
                },
            )
            .optional()?;

        if row.is_some() {
            conn.execute(
                "UPDATE geocode_cache
                 SET hit_count = hit_count + 1, last_used_at = ?2
                 WHERE key = ?1",
                params![key, now_unix()],
            )?;
        }
        Ok(row)
    }

    /// Insert or refresh one entry. A re-resolved place replaces the old row
    /// wholesale but keeps its accumulated hit count.
    pub fn put(&self, key: &str, result: &GeocodeResult) -> Result<(), StoreError> {
        let now = now_unix();
        self.conn.lock().execute(
            "INSERT INTO geocode_cache
                 (key, name, latitude, longitude, confidence, source,
                  hit_count, created_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
             ON CONFLICT(key) DO UPDATE SET
                 name = excluded.name,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 confidence = excluded.confidence,
                 source = excluded.source,
                 last_used_at = excluded.last_used_at",
            params![
                key,
                result.name,
                result.latitude,
                result.longitude,
                result.confidence,
                result.source.as_str(),
                now
            ],
        )?;
        Ok(())
    }

    pub fn entry_count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM geocode_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
