// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job admission, claiming, and state transitions.
//!
//! All atomicity lives in the [`JobStore`]: admission is one upsert keyed by
//! `unique_id`, and a claim is one conditional update that only a single
//! caller can win.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use framegrid_core::{AdmitOutcome, AdmitRequest, GridError, Job, JobCounts, JobStore};

/// Thin, cloneable front for the job table.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    max_retries: u32,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Idempotent upsert keyed by the content's `unique_id`.
    ///
    /// A new row starts `pending` at retry 0. An existing row is re-armed to
    /// `pending` with its retry count bumped, unless it is mid-claim (it stays
    /// `processing` with its original source) or it already used up
    /// `max_retries`.
    pub async fn admit(&self, request: &AdmitRequest) -> Result<AdmitOutcome, GridError> {
        let outcome = self.store.upsert_job(request, self.max_retries).await?;
        let unique_id = request.content.unique_id.as_str();
        match outcome {
            AdmitOutcome::Inserted { job_id } => {
                info!(job_id, unique_id, "job admitted");
            }
            AdmitOutcome::Rearmed {
                job_id,
                retry_count,
            } => {
                info!(job_id, unique_id, retry_count, "job re-armed");
            }
            AdmitOutcome::InProgress {
                job_id,
                retry_count,
            } => {
                info!(job_id, unique_id, retry_count, "job already claimed, source kept");
            }
            AdmitOutcome::RetryLimitReached {
                job_id,
                retry_count,
            } => {
                warn!(
                    job_id,
                    unique_id,
                    retry_count,
                    max_retries = self.max_retries,
                    "job exhausted its retries, not re-armed"
                );
            }
        }
        Ok(outcome)
    }

    /// Claims the oldest pending job, or `None` if there is none or another
    /// claimant won the race.
    pub async fn claim_next(&self) -> Result<Option<Job>, GridError> {
        let job = self.store.claim_next_job().await?;
        match &job {
            Some(job) => info!(
                job_id = job.id,
                unique_id = %job.content.unique_id,
                retry_count = job.retry_count,
                "claimed job"
            ),
            None => debug!("no pending job to claim"),
        }
        Ok(job)
    }

    pub async fn complete(&self, job_id: i64, result_handle: &str) -> Result<(), GridError> {
        self.store.complete_job(job_id, result_handle).await?;
        info!(job_id, "job done");
        Ok(())
    }

    /// Marks the job failed. The row is kept so a later admission can re-arm it.
    pub async fn fail(&self, job_id: i64, reason: &str) -> Result<(), GridError> {
        self.store.fail_job(job_id, reason).await?;
        warn!(job_id, reason, "job failed");
        Ok(())
    }

    /// Returns a claimed job to `pending` without counting a retry.
    pub async fn release(&self, job_id: i64) -> Result<(), GridError> {
        self.store.release_job(job_id).await?;
        info!(job_id, "job released back to pending");
        Ok(())
    }

    /// Requeues `processing` jobs whose claim is older than `older_than`.
    pub async fn reclaim_stale(&self, older_than: Duration) -> Result<u64, GridError> {
        let reclaimed = self.store.reclaim_stale_jobs(older_than).await?;
        if reclaimed > 0 {
            warn!(
                reclaimed,
                older_than_secs = older_than.as_secs(),
                "reclaimed stale processing jobs"
            );
        }
        Ok(reclaimed)
    }

    pub async fn get(&self, job_id: i64) -> Result<Option<Job>, GridError> {
        self.store.get_job(job_id).await
    }

    pub async fn counts(&self) -> Result<JobCounts, GridError> {
        self.store.job_counts().await
    }
}
