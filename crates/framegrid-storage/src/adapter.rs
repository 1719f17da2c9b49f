// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`JobStore`] trait.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use framegrid_config::model::StorageConfig;
use framegrid_core::{
    AdapterType, AdmitOutcome, AdmitRequest, Cursor, DedupRecord, DocumentMeta, FileType,
    GridError, HealthStatus, Job, JobCounts, JobStore, PhotoRecord, PluginAdapter,
    ResourceHandle, VideoMeta,
};

use crate::database::{Database, map_tr_err, storage_msg};
use crate::queries;

/// SQLite-backed job store.
///
/// The connection opens on [`JobStore::initialize`] and is released by
/// [`JobStore::close`]; every query in between fails if it is not open.
pub struct SqliteStore {
    config: StorageConfig,
    db: Mutex<Option<Database>>,
}

impl SqliteStore {
    /// Creates the store without opening the database.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: Mutex::new(None),
        }
    }

    fn db(&self) -> Result<Database, GridError> {
        self.db
            .lock()
            .map_err(|_| storage_msg("storage handle poisoned".to_string()))?
            .clone()
            .ok_or_else(|| storage_msg("storage is not open; call initialize() first".to_string()))
    }

    fn take_db(&self) -> Option<Database> {
        self.db.lock().ok().and_then(|mut slot| slot.take())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        match self.take_db() {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn initialize(&self) -> Result<(), GridError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        let mut slot = self
            .db
            .lock()
            .map_err(|_| storage_msg("storage handle poisoned".to_string()))?;
        if slot.is_some() {
            return Err(storage_msg("storage already initialized".to_string()));
        }
        *slot = Some(db);
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GridError> {
        let db = self
            .take_db()
            .ok_or_else(|| storage_msg("storage is not open".to_string()))?;
        db.close().await
    }

    async fn load_cursor(&self, source_id: i64, scope: i64) -> Result<Option<Cursor>, GridError> {
        queries::cursor::load(&self.db()?, source_id, scope).await
    }

    async fn advance_cursor(
        &self,
        source_id: i64,
        scope: i64,
        offset: i64,
    ) -> Result<bool, GridError> {
        queries::cursor::advance(&self.db()?, source_id, scope, offset).await
    }

    async fn upsert_job(
        &self,
        request: &AdmitRequest,
        max_retries: u32,
    ) -> Result<AdmitOutcome, GridError> {
        queries::jobs::upsert_job(&self.db()?, request, max_retries).await
    }

    async fn claim_next_job(&self) -> Result<Option<Job>, GridError> {
        queries::jobs::claim_next(&self.db()?).await
    }

    async fn complete_job(&self, job_id: i64, result_handle: &str) -> Result<(), GridError> {
        queries::jobs::complete(&self.db()?, job_id, result_handle).await
    }

    async fn fail_job(&self, job_id: i64, reason: &str) -> Result<(), GridError> {
        queries::jobs::fail(&self.db()?, job_id, reason).await
    }

    async fn release_job(&self, job_id: i64) -> Result<(), GridError> {
        queries::jobs::release(&self.db()?, job_id).await
    }

    async fn reclaim_stale_jobs(&self, older_than: Duration) -> Result<u64, GridError> {
        queries::jobs::reclaim_stale(&self.db()?, older_than).await
    }

    async fn get_job(&self, job_id: i64) -> Result<Option<Job>, GridError> {
        queries::jobs::get(&self.db()?, job_id).await
    }

    async fn job_counts(&self) -> Result<JobCounts, GridError> {
        queries::jobs::counts(&self.db()?).await
    }

    async fn upsert_resource_handle(
        &self,
        file_type: FileType,
        unique_id: &str,
        resource_id: &str,
        account_name: &str,
    ) -> Result<(), GridError> {
        queries::handles::upsert(&self.db()?, file_type, unique_id, resource_id, account_name)
            .await
    }

    async fn resource_handles(
        &self,
        file_type: FileType,
        unique_id: &str,
    ) -> Result<Vec<ResourceHandle>, GridError> {
        queries::handles::list(&self.db()?, file_type, unique_id).await
    }

    async fn find_dedup_record(
        &self,
        original_unique_id: &str,
    ) -> Result<Option<DedupRecord>, GridError> {
        queries::dedup::find(&self.db()?, original_unique_id).await
    }

    async fn upsert_dedup_record(&self, record: &DedupRecord) -> Result<(), GridError> {
        queries::dedup::upsert(&self.db()?, record).await
    }

    async fn upsert_video_meta(&self, meta: &VideoMeta) -> Result<(), GridError> {
        queries::media::upsert_video(&self.db()?, meta).await
    }

    async fn upsert_document_meta(
        &self,
        meta: &DocumentMeta,
        caption: Option<&str>,
    ) -> Result<(), GridError> {
        queries::media::upsert_document(&self.db()?, meta, caption).await
    }

    async fn upsert_photo(&self, photo: &PhotoRecord) -> Result<(), GridError> {
        queries::media::upsert_photo(&self.db()?, photo).await
    }

    async fn get_photo(&self, unique_id: &str) -> Result<Option<PhotoRecord>, GridError> {
        queries::media::get_photo(&self.db()?, unique_id).await
    }
}

#[cfg(test)]
mod tests {
    use framegrid_core::{ContentRef, JobState, SourceRef};
    use tempfile::tempdir;

    use super::*;

    fn make_config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn queries_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir.path().join("a.db")));
        assert!(store.health_check().await.is_err());
        assert!(store.claim_next_job().await.is_err());
    }

    #[tokio::test]
    async fn double_initialize_is_rejected() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir.path().join("b.db")));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_releases_the_connection() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(make_config(&dir.path().join("c.db")));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        store.close().await.unwrap();
        assert!(store.health_check().await.is_err());
        assert!(store.close().await.is_err());
        // shutdown after close is a no-op
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = make_config(&dir.path().join("d.db"));

        let store = SqliteStore::new(config.clone());
        store.initialize().await.unwrap();
        let request = AdmitRequest {
            content: ContentRef {
                resource_id: "res".into(),
                unique_id: "vid".into(),
            },
            file_type: FileType::Video,
            owner_account: "alpha".into(),
            source: SourceRef {
                chat_id: 1,
                message_id: 2,
            },
        };
        let id = store.upsert_job(&request, 5).await.unwrap().job_id();
        store.advance_cursor(9, 0, 33).await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteStore::new(config);
        reopened.initialize().await.unwrap();
        let job = reopened.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(
            reopened.load_cursor(9, 0).await.unwrap().unwrap().last_offset,
            33
        );
        reopened.shutdown().await.unwrap();
    }
}
