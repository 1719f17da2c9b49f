// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The consume-one-job cycle.
//!
//! claim → download → compose → fingerprint → publish → record → complete,
//! then the best-effort archive bundle. Any failure before `complete` marks
//! the job failed. The downloaded file is kept on failure so a re-admitted
//! job resumes instead of starting over.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use framegrid_config::model::FramegridConfig;
use framegrid_core::{
    AccountContext, ArchivePackager, DownloadSource, FileType, GridError, Job, JobStore,
    PhotoRecord, TransportClient,
};
use framegrid_media::{ContentFingerprinter, GridComposer};

use crate::dedup::DedupIndex;
use crate::download::ResumableDownloader;
use crate::queue::JobQueue;

/// Knobs for one worker cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub rows: u32,
    pub cols: u32,
    pub work_dir: PathBuf,
    pub keep_artifacts: bool,
    pub archive_enabled: bool,
    /// Fixed archive password; the job's `unique_id` when unset.
    pub archive_password: Option<String>,
    pub empty_queue_delay: Duration,
    pub stale_after: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &FramegridConfig) -> Self {
        Self {
            rows: config.grid.rows,
            cols: config.grid.cols,
            work_dir: config.transfer.work_dir.clone(),
            keep_artifacts: config.transfer.keep_artifacts,
            archive_enabled: config.archive.enabled,
            archive_password: config.archive.password.clone(),
            empty_queue_delay: Duration::from_secs(config.queue.empty_queue_shutdown_secs),
            stale_after: Duration::from_secs(config.queue.stale_after_secs),
        }
    }
}

/// Ephemeral files of one job, all named by the content's `unique_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifacts {
    pub video: PathBuf,
    pub preview: PathBuf,
    pub archive: PathBuf,
}

impl JobArtifacts {
    pub fn new(work_dir: &Path, unique_id: &str) -> Self {
        Self {
            video: work_dir.join(format!("{unique_id}.mp4")),
            preview: work_dir.join(format!("preview_{unique_id}.jpg")),
            archive: work_dir.join(format!("{unique_id}.zip")),
        }
    }

    async fn remove_all(&self) {
        for path in [&self.video, &self.preview, &self.archive] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove artifact"),
            }
        }
    }
}

/// How one worker cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No pending job after the empty-queue delay.
    Idle,
    Completed {
        job_id: i64,
        thumbnail_unique_id: String,
        archived: bool,
    },
    Failed {
        job_id: i64,
        reason: String,
    },
    /// Cancelled mid-job; the job went back to `pending`.
    Released { job_id: i64 },
    /// Cancelled before a job was claimed.
    Cancelled,
}

pub struct JobWorker {
    store: Arc<dyn JobStore>,
    transport: Arc<dyn TransportClient>,
    queue: JobQueue,
    dedup: DedupIndex,
    downloader: ResumableDownloader,
    composer: GridComposer,
    fingerprinter: ContentFingerprinter,
    packager: Arc<dyn ArchivePackager>,
    account: AccountContext,
    settings: WorkerSettings,
}

impl JobWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn JobStore>,
        transport: Arc<dyn TransportClient>,
        queue: JobQueue,
        downloader: ResumableDownloader,
        composer: GridComposer,
        packager: Arc<dyn ArchivePackager>,
        account: AccountContext,
        settings: WorkerSettings,
    ) -> Self {
        let dedup = DedupIndex::new(store.clone());
        Self {
            store,
            transport,
            queue,
            dedup,
            downloader,
            composer,
            fingerprinter: ContentFingerprinter::new(),
            packager,
            account,
            settings,
        }
    }

    /// Runs one cycle: reclaim stale claims, claim a job, process it.
    ///
    /// Store errors while claiming or finalizing propagate; errors while
    /// processing become [`CycleOutcome::Failed`].
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleOutcome, GridError> {
        self.queue.reclaim_stale(self.settings.stale_after).await?;

        let claimed = tokio::select! {
            _ = cancel.cancelled() => return Ok(CycleOutcome::Cancelled),
            r = self.queue.claim_next() => r?,
        };
        let Some(job) = claimed else {
            info!(
                delay_secs = self.settings.empty_queue_delay.as_secs(),
                "no pending job, ending cycle after delay"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Ok(CycleOutcome::Cancelled),
                _ = tokio::time::sleep(self.settings.empty_queue_delay) => {}
            }
            return Ok(CycleOutcome::Idle);
        };

        match self.process(&job, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(GridError::Cancelled) => {
                self.queue.release(job.id).await?;
                Ok(CycleOutcome::Released { job_id: job.id })
            }
            Err(e) => {
                error!(job_id = job.id, unique_id = %job.content.unique_id, error = %e, "job failed");
                let reason = e.to_string();
                self.queue.fail(job.id, &reason).await?;
                Ok(CycleOutcome::Failed {
                    job_id: job.id,
                    reason,
                })
            }
        }
    }

    async fn process(&self, job: &Job, cancel: &CancellationToken) -> Result<CycleOutcome, GridError> {
        let unique_id = job.content.unique_id.as_str();
        tokio::fs::create_dir_all(&self.settings.work_dir).await?;
        let artifacts = JobArtifacts::new(&self.settings.work_dir, unique_id);

        let source = DownloadSource {
            content: job.content.clone(),
            origin: job.source,
            size_hint: None,
        };
        let last_decile = AtomicU64::new(0);
        let progress = |offset: u64, total: u64| {
            let decile = offset.saturating_mul(10) / total.max(1);
            if decile > last_decile.swap(decile, Ordering::Relaxed) {
                info!(job_id = job.id, offset, total, "download {}%", decile * 10);
            }
        };
        self.downloader
            .fetch(&source, &artifacts.video, cancel, Some(&progress))
            .await?;

        if cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        let grid = self
            .composer
            .compose(
                &artifacts.video,
                self.settings.rows,
                self.settings.cols,
                unique_id,
                &artifacts.preview,
            )
            .await?;
        let phash = self.fingerprinter.fingerprint_file(&grid.path).await?;

        let sent = self
            .transport
            .send_photo(job.source.chat_id, &grid.path, Some(job.source.message_id))
            .await?;
        info!(job_id = job.id, thumbnail = %sent.unique_id, "preview published");

        self.store
            .upsert_photo(&PhotoRecord {
                unique_id: sent.unique_id.clone(),
                size: sent.size,
                width: sent.width,
                height: sent.height,
                phash: Some(phash.to_string()),
            })
            .await?;
        self.store
            .upsert_resource_handle(
                FileType::Photo,
                &sent.unique_id,
                &sent.resource_id,
                &self.account.name,
            )
            .await?;
        self.dedup
            .record(unique_id, &sent.unique_id, &self.account.name, &sent.resource_id)
            .await?;
        self.queue.complete(job.id, &sent.resource_id).await?;

        let archived = self.settings.archive_enabled && self.deliver_archive(job, &artifacts).await;
        if !self.settings.keep_artifacts {
            artifacts.remove_all().await;
        }

        Ok(CycleOutcome::Completed {
            job_id: job.id,
            thumbnail_unique_id: sent.unique_id,
            archived,
        })
    }

    /// Packs the video and preview and replies with the archive. The job is
    /// already done, so failures are only logged.
    async fn deliver_archive(&self, job: &Job, artifacts: &JobArtifacts) -> bool {
        let unique_id = job.content.unique_id.as_str();
        let password = self.settings.archive_password.as_deref().unwrap_or(unique_id);
        let files = [artifacts.video.clone(), artifacts.preview.clone()];

        let result = async {
            self.packager
                .package_encrypted(&files, &artifacts.archive, password)
                .await?;
            let caption = format!("Packed and encrypted: {unique_id}.zip");
            self.transport
                .send_file(
                    job.source.chat_id,
                    &artifacts.archive,
                    Some(job.source.message_id),
                    Some(&caption),
                )
                .await
        }
        .await;

        match result {
            Ok(sent) => {
                info!(job_id = job.id, archive = %sent.unique_id, "archive delivered");
                true
            }
            Err(e) => {
                error!(job_id = job.id, error = %e, "archive delivery failed");
                false
            }
        }
    }
}
