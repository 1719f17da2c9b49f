// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management.
//!
//! Every statement runs on tokio-rusqlite's single background thread, which
//! makes it the only writer. Do not open a second connection for writes.

use framegrid_core::GridError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the job database. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path`, applies PRAGMAs, and runs
    /// migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, GridError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| GridError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| GridError::Storage {
                source: Box::new(e),
            })?;
        conn.call(move |conn| -> Result<Result<(), GridError>, rusqlite::Error> {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database, for tests.
    pub async fn open_in_memory() -> Result<Self, GridError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| GridError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| -> Result<Result<(), GridError>, rusqlite::Error> {
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), GridError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

/// Maps a tokio-rusqlite failure into the storage error variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GridError {
    GridError::Storage {
        source: Box::new(e),
    }
}

/// Storage error carrying a plain message, for failed preconditions.
pub(crate) fn storage_msg(message: String) -> GridError {
    GridError::Storage {
        source: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_in_wal_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("grid.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let (mode, tables) = db
            .connection()
            .call(|conn| -> Result<(String, i64), rusqlite::Error> {
                let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
                let tables: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('jobs', 'resource_handles', 'dedup_records', 'cursors',
                                  'videos', 'documents', 'photos')",
                    [],
                    |r| r.get(0),
                )?;
                Ok((mode, tables))
            })
            .await
            .unwrap();

        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(tables, 7);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.db");
        let path = path.to_str().unwrap();
        Database::open(path, true).await.unwrap().close().await.unwrap();
        let db = Database::open(path, true).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn opening_a_directory_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let result = Database::open(dir.path().to_str().unwrap(), true).await;
        assert!(matches!(result, Err(GridError::Storage { .. })));
    }

    #[tokio::test]
    async fn in_memory_database_has_the_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let jobs = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert_eq!(jobs, 0);
    }
}
