// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offset-tracked polling of the update stream.
//!
//! The persisted offset only moves forward, and only after every update it
//! covers has been dispatched. A crash in between re-delivers the batch,
//! which admission upserts absorb.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use framegrid_config::model::{IngestConfig, TelegramConfig};
use framegrid_core::{AccountContext, GridError, JobStore, TransportClient, Update};

use crate::intake::{IngestOutcome, Intake};

/// Cursor scope used for the account's own update stream.
pub const CURSOR_SCOPE: i64 = 0;

/// Polling cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub limit: u32,
    pub timeout: Duration,
    pub idle_backoff: Duration,
    /// Finish after this many consecutive empty polls. `None` polls until
    /// cancelled.
    pub idle_polls_before_exit: Option<u32>,
}

impl PollSettings {
    pub fn from_config(telegram: &TelegramConfig, ingest: &IngestConfig) -> Self {
        Self {
            limit: telegram.poll_limit,
            timeout: Duration::from_secs(telegram.poll_timeout_secs),
            idle_backoff: Duration::from_secs(ingest.idle_backoff_secs),
            idle_polls_before_exit: ingest.idle_polls_before_exit,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            limit: 100,
            timeout: Duration::from_secs(5),
            idle_backoff: Duration::from_secs(1),
            idle_polls_before_exit: None,
        }
    }
}

/// Per-update results of one dispatched batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Highest offset among dispatched updates.
    pub max_offset: Option<i64>,
    pub results: Vec<(i64, Result<IngestOutcome, GridError>)>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn queued(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(IngestOutcome::Queued { .. })))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| r.as_ref().is_ok_and(IngestOutcome::is_duplicate))
            .count()
    }
}

/// Totals over one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub batches: u64,
    pub updates: u64,
    pub queued: u64,
    pub duplicates: u64,
    pub failures: u64,
    pub last_offset: i64,
}

impl IngestSummary {
    fn absorb(&mut self, report: &BatchReport) {
        self.batches += 1;
        self.updates += report.results.len() as u64;
        self.queued += report.queued() as u64;
        self.duplicates += report.duplicates() as u64;
        self.failures += report.failures() as u64;
    }
}

pub struct IngestionCursor {
    store: Arc<dyn JobStore>,
    transport: Arc<dyn TransportClient>,
    intake: Intake,
    account: AccountContext,
    settings: PollSettings,
}

impl IngestionCursor {
    pub fn new(
        store: Arc<dyn JobStore>,
        transport: Arc<dyn TransportClient>,
        intake: Intake,
        account: AccountContext,
        settings: PollSettings,
    ) -> Self {
        Self {
            store,
            transport,
            intake,
            account,
            settings,
        }
    }

    /// Last persisted offset for this account, 0 if never advanced.
    pub async fn current_offset(&self) -> Result<i64, GridError> {
        Ok(self
            .store
            .load_cursor(self.account.id, CURSOR_SCOPE)
            .await?
            .map_or(0, |c| c.last_offset))
    }

    /// One bounded batch of updates at or after `since`.
    pub async fn poll(&self, since: i64) -> Result<Vec<Update>, GridError> {
        self.transport
            .fetch_updates_since(since, self.settings.limit, self.settings.timeout)
            .await
    }

    /// Persists `max_observed` if it is beyond the stored offset.
    pub async fn advance(&self, max_observed: i64) -> Result<bool, GridError> {
        let moved = self
            .store
            .advance_cursor(self.account.id, CURSOR_SCOPE, max_observed)
            .await?;
        if moved {
            debug!(offset = max_observed, "cursor advanced");
        }
        Ok(moved)
    }

    /// Dispatches every update in order, isolating failures per update.
    ///
    /// Stops early on cancellation; `max_offset` then only covers what was
    /// dispatched.
    pub async fn dispatch(&self, updates: &[Update], cancel: &CancellationToken) -> BatchReport {
        let mut report = BatchReport::default();
        for update in updates {
            if cancel.is_cancelled() {
                info!(
                    remaining = updates.len() - report.results.len(),
                    "cancelled mid-batch"
                );
                break;
            }
            let result = match &update.message {
                Some(message) => self.intake.handle(message).await,
                None => Ok(IngestOutcome::Ignored),
            };
            if let Err(e) = &result {
                error!(offset = update.offset, error = %e, "failed to handle update");
            }
            let max = report.max_offset.map_or(update.offset, |m| m.max(update.offset));
            report.max_offset = Some(max);
            report.results.push((update.offset, result));
        }
        report
    }

    /// Polls until cancelled, a non-transient poll error occurs, or the idle
    /// limit is reached.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<IngestSummary, GridError> {
        let mut last = self.current_offset().await?;
        let mut summary = IngestSummary {
            last_offset: last,
            ..IngestSummary::default()
        };
        let mut idle_polls = 0u32;
        info!(from = last + 1, "polling for updates");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.poll(last + 1) => r,
            };
            let updates = match polled {
                Ok(updates) => updates,
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "poll failed, backing off");
                    if !self.idle(cancel).await {
                        break;
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            if updates.is_empty() {
                idle_polls += 1;
                if self
                    .settings
                    .idle_polls_before_exit
                    .is_some_and(|limit| idle_polls >= limit)
                {
                    info!(idle_polls, "no backlog, ingestion finished");
                    break;
                }
                if !self.idle(cancel).await {
                    break;
                }
                continue;
            }
            idle_polls = 0;

            let report = self.dispatch(&updates, cancel).await;
            if let Some(max) = report.max_offset.filter(|m| *m > last) {
                self.advance(max).await?;
                last = max;
            }
            summary.absorb(&report);
            summary.last_offset = last;
            info!(
                updates = report.results.len(),
                queued = report.queued(),
                failures = report.failures(),
                offset = last,
                "batch processed"
            );
        }

        info!(
            batches = summary.batches,
            updates = summary.updates,
            offset = summary.last_offset,
            "polling stopped"
        );
        Ok(summary)
    }

    /// Sleeps the idle backoff. Returns false if cancelled meanwhile.
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.idle_backoff) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use framegrid_core::JobState;
    use framegrid_test_utils::{MockTransport, TestHarness, fixtures};

    use super::*;
    use crate::queue::JobQueue;

    fn cursor(harness: &TestHarness, idle_exit: Option<u32>) -> IngestionCursor {
        let store = harness.store.clone();
        let transport: Arc<MockTransport> = harness.transport.clone();
        let intake = Intake::new(
            store.clone(),
            transport.clone(),
            JobQueue::new(store.clone(), 5),
            harness.bypass.clone(),
            harness.account.clone(),
        );
        IngestionCursor::new(
            store,
            transport,
            intake,
            harness.account.clone(),
            PollSettings {
                idle_backoff: Duration::from_millis(1),
                idle_polls_before_exit: idle_exit,
                ..PollSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn offset_defaults_to_zero_and_never_decreases() {
        let harness = TestHarness::builder().build().await.unwrap();
        let cursor = cursor(&harness, None);

        assert_eq!(cursor.current_offset().await.unwrap(), 0);
        assert!(cursor.advance(10).await.unwrap());
        assert!(!cursor.advance(7).await.unwrap());
        assert!(!cursor.advance(10).await.unwrap());
        assert_eq!(cursor.current_offset().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn run_admits_batch_and_persists_max_offset() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.transport.push_updates(vec![
            fixtures::update(5, fixtures::video_message(1, 50, "v1", 60)),
            fixtures::update(6, fixtures::text_message(1, 51)),
            fixtures::update(7, fixtures::video_message(1, 52, "v2", 60)),
        ]);
        let cursor = cursor(&harness, Some(1));

        let summary = cursor.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.updates, 3);
        assert_eq!(summary.queued, 2);
        assert_eq!(summary.last_offset, 7);
        assert_eq!(cursor.current_offset().await.unwrap(), 7);
        assert_eq!(harness.store.job_counts().await.unwrap().pending, 2);
        // Second poll asks for the offset after the batch.
        assert_eq!(harness.transport.polled_offsets(), vec![1, 8]);
    }

    #[tokio::test]
    async fn redelivered_batch_only_bumps_retry_counts() {
        let harness = TestHarness::builder().build().await.unwrap();
        let batch = vec![fixtures::update(3, fixtures::video_message(1, 9, "v1", 60))];
        let cursor = cursor(&harness, None);
        let cancel = CancellationToken::new();

        let first = cursor.dispatch(&batch, &cancel).await;
        let second = cursor.dispatch(&batch, &cancel).await;

        let Ok(IngestOutcome::Queued { job_id, .. }) = &first.results[0].1 else {
            panic!("expected first delivery to queue");
        };
        assert!(matches!(
            second.results[0].1,
            Ok(IngestOutcome::Queued { retry_count: 1, .. })
        ));
        let counts = harness.store.job_counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        let job = harness.store.get_job(*job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
    }

    #[tokio::test]
    async fn poisoned_update_does_not_stall_the_cursor() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.transport.push_updates(vec![
            fixtures::update(1, fixtures::video_message(1, 1, "ok-1", 60)),
            fixtures::update(2, fixtures::video_message(1, 2, "boom", 60)),
            fixtures::update(3, fixtures::video_message(1, 3, "ok-2", 60)),
        ]);
        // A recorded preview sends "boom" down the resend path, and resends fail.
        harness
            .store
            .upsert_resource_handle(framegrid_core::FileType::Photo, "t", "r", "gridbot")
            .await
            .unwrap();
        crate::dedup::DedupIndex::new(harness.store.clone())
            .record("boom", "t", "gridbot", "r")
            .await
            .unwrap();
        harness.transport.fail_sends(true);
        let cursor = cursor(&harness, Some(1));

        let summary = cursor.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.queued, 2);
        assert_eq!(cursor.current_offset().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn cancellation_ends_an_idle_loop() {
        let harness = TestHarness::builder().build().await.unwrap();
        let cursor = cursor(&harness, None);
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.cancel();
        });

        let summary = cursor.run(&cancel).await.unwrap();
        assert_eq!(summary.batches, 0);
        assert_eq!(cursor.current_offset().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transient_poll_errors_are_retried() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.transport.fail_next_polls(2);
        harness
            .transport
            .push_updates(vec![fixtures::update(4, fixtures::video_message(1, 4, "v", 60))]);
        let cursor = cursor(&harness, Some(1));

        let summary = cursor.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.last_offset, 4);
    }
}
