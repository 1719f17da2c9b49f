// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One batch cycle: ingestion and a single job race to completion.
//!
//! Both activities share a child of the caller's cancellation token. The
//! first to return cancels it, the other unwinds at its next suspension
//! point, and the store and transport are released on every path.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use framegrid_config::model::FramegridConfig;
use framegrid_core::{
    AccountContext, ArchivePackager, ContentBypass, FrameSource, GridError, JobStore,
    LabelRenderer, TransportClient,
};
use framegrid_media::GridComposer;

use crate::cursor::{IngestSummary, IngestionCursor, PollSettings};
use crate::download::ResumableDownloader;
use crate::intake::Intake;
use crate::queue::JobQueue;
use crate::worker::{CycleOutcome, JobWorker, WorkerSettings};

/// Which activity ended the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Ingestion,
    Worker,
    /// The caller's token fired before either finished.
    External,
}

#[derive(Debug)]
pub struct CycleReport {
    pub first: Activity,
    pub ingestion: Result<IngestSummary, GridError>,
    pub worker: Result<CycleOutcome, GridError>,
}

impl CycleReport {
    pub fn is_ok(&self) -> bool {
        self.ingestion.is_ok() && self.worker.is_ok()
    }
}

/// External systems a cycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn JobStore>,
    pub transport: Arc<dyn TransportClient>,
    pub frames: Arc<dyn FrameSource>,
    pub label: Option<Arc<dyn LabelRenderer>>,
    pub packager: Arc<dyn ArchivePackager>,
    pub bypass: Arc<dyn ContentBypass>,
}

pub struct Orchestrator {
    cursor: IngestionCursor,
    worker: JobWorker,
    store: Arc<dyn JobStore>,
    transport: Arc<dyn TransportClient>,
}

impl Orchestrator {
    pub fn new(
        cursor: IngestionCursor,
        worker: JobWorker,
        store: Arc<dyn JobStore>,
        transport: Arc<dyn TransportClient>,
    ) -> Self {
        Self {
            cursor,
            worker,
            store,
            transport,
        }
    }

    /// Wires the cursor and worker for `account` from `config`.
    pub fn from_config(
        config: &FramegridConfig,
        account: AccountContext,
        parts: Collaborators,
    ) -> Result<Self, GridError> {
        let queue = JobQueue::new(parts.store.clone(), config.queue.max_retries);
        let intake = Intake::new(
            parts.store.clone(),
            parts.transport.clone(),
            queue.clone(),
            parts.bypass,
            account.clone(),
        );
        let cursor = IngestionCursor::new(
            parts.store.clone(),
            parts.transport.clone(),
            intake,
            account.clone(),
            PollSettings::from_config(&config.telegram, &config.ingest),
        );
        let downloader =
            ResumableDownloader::from_config(parts.transport.clone(), &config.transfer)?;
        let worker = JobWorker::new(
            parts.store.clone(),
            parts.transport.clone(),
            queue,
            downloader,
            GridComposer::new(parts.frames, parts.label),
            parts.packager,
            account,
            WorkerSettings::from_config(config),
        );
        Ok(Self::new(cursor, worker, parts.store, parts.transport))
    }

    /// Runs one cycle and tears down shared resources before returning.
    pub async fn run(self, shutdown: &CancellationToken) -> CycleReport {
        let race = shutdown.child_token();
        let first = OnceLock::new();
        let finish = |who: Activity| {
            let who = if shutdown.is_cancelled() {
                Activity::External
            } else {
                who
            };
            let _ = first.set(who);
            race.cancel();
        };

        let ingest = async {
            let r = self.cursor.run(&race).await;
            finish(Activity::Ingestion);
            r
        };
        let work = async {
            let r = self.worker.run_once(&race).await;
            finish(Activity::Worker);
            r
        };
        let (ingestion, worker) = tokio::join!(ingest, work);

        let first = first.get().copied().unwrap_or(Activity::External);
        match (&ingestion, &worker) {
            (Ok(summary), Ok(outcome)) => {
                info!(?first, updates = summary.updates, ?outcome, "cycle finished");
            }
            _ => warn!(?first, "cycle finished with errors"),
        }

        self.teardown().await;
        CycleReport {
            first,
            ingestion,
            worker,
        }
    }

    async fn teardown(&self) {
        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport shutdown failed");
        }
        if let Err(e) = self.store.close().await {
            error!(error = %e, "store close failed");
        }
    }
}
