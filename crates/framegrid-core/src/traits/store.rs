// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job store trait for the durable relational backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GridError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AdmitOutcome, AdmitRequest, Cursor, DedupRecord, DocumentMeta, FileType, Job, JobCounts,
    PhotoRecord, ResourceHandle, VideoMeta,
};

/// Durable storage for jobs, resource handles, dedup records, the polling
/// cursor, and media metadata.
///
/// Implementations own every persisted row. Claims must be a single atomic
/// read-modify-write; two callers never receive the same job.
#[async_trait]
pub trait JobStore: PluginAdapter {
    /// Opens connections and applies pending migrations.
    async fn initialize(&self) -> Result<(), GridError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), GridError>;

    // --- cursor ---

    async fn load_cursor(&self, source_id: i64, scope: i64) -> Result<Option<Cursor>, GridError>;

    /// Persists `offset` only if it is greater than the stored value.
    /// Returns whether the row changed.
    async fn advance_cursor(
        &self,
        source_id: i64,
        scope: i64,
        offset: i64,
    ) -> Result<bool, GridError>;

    // --- jobs ---

    /// Idempotent upsert keyed by `unique_id`. Existing rows below
    /// `max_retries` are re-armed to pending with the retry count bumped.
    async fn upsert_job(
        &self,
        request: &AdmitRequest,
        max_retries: u32,
    ) -> Result<AdmitOutcome, GridError>;

    /// Atomically moves the oldest pending job to processing.
    async fn claim_next_job(&self) -> Result<Option<Job>, GridError>;

    async fn complete_job(&self, job_id: i64, result_handle: &str) -> Result<(), GridError>;

    async fn fail_job(&self, job_id: i64, reason: &str) -> Result<(), GridError>;

    /// Returns a processing job to pending without touching its retry count.
    async fn release_job(&self, job_id: i64) -> Result<(), GridError>;

    /// Returns processing jobs started longer than `older_than` ago to pending.
    async fn reclaim_stale_jobs(&self, older_than: Duration) -> Result<u64, GridError>;

    async fn get_job(&self, job_id: i64) -> Result<Option<Job>, GridError>;

    async fn job_counts(&self) -> Result<JobCounts, GridError>;

    // --- resource handles ---

    /// Upserts on `(file_type, unique_id, account_name)`, refreshing `resource_id`.
    async fn upsert_resource_handle(
        &self,
        file_type: FileType,
        unique_id: &str,
        resource_id: &str,
        account_name: &str,
    ) -> Result<(), GridError>;

    /// All handles known for a unique id, oldest first.
    async fn resource_handles(
        &self,
        file_type: FileType,
        unique_id: &str,
    ) -> Result<Vec<ResourceHandle>, GridError>;

    // --- dedup records ---

    async fn find_dedup_record(
        &self,
        original_unique_id: &str,
    ) -> Result<Option<DedupRecord>, GridError>;

    async fn upsert_dedup_record(&self, record: &DedupRecord) -> Result<(), GridError>;

    // --- media metadata ---

    async fn upsert_video_meta(&self, meta: &VideoMeta) -> Result<(), GridError>;

    async fn upsert_document_meta(
        &self,
        meta: &DocumentMeta,
        caption: Option<&str>,
    ) -> Result<(), GridError>;

    async fn upsert_photo(&self, photo: &PhotoRecord) -> Result<(), GridError>;

    async fn get_photo(&self, unique_id: &str) -> Result<Option<PhotoRecord>, GridError>;
}
