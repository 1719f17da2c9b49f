// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message handling: metadata, dedup short-circuit, admission, and acks.

use std::sync::Arc;

use tracing::{info, warn};

use framegrid_core::{
    AccountContext, AdmitOutcome, AdmitRequest, Attachment, ContentBypass, ContentRef,
    DocumentMeta, FileType, GridError, InboundMessage, JobStore, SourceRef, TransportClient,
    VideoMeta,
};

use crate::dedup::{DedupDecision, DedupIndex};
use crate::queue::JobQueue;

pub const ACK_QUEUED: &str = "Queued for keyframe grid";
pub const ACK_THUMBNAIL_EXISTS: &str = "Thumbnail already exists";
pub const ACK_DOCUMENT_STORED: &str = "Document stored";

/// What handling one inbound message amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nothing the pipeline acts on.
    Ignored,
    /// A job was created or re-armed.
    Queued { job_id: i64, retry_count: u32 },
    /// The job is being processed; the reply goes to the claimed message.
    InProgress { job_id: i64 },
    /// The job exists but may not be re-armed again.
    RetryLimitReached { job_id: i64 },
    /// The existing preview was resent by handle.
    DuplicateResent { thumbnail_unique_id: String },
    /// Another account holds the preview; a copy was requested.
    DuplicateBypassed {
        thumbnail_unique_id: String,
        from_account: String,
    },
    /// A preview is recorded but unreachable; no job is admitted.
    DuplicateOrphaned { thumbnail_unique_id: String },
    /// A non-video document was recorded.
    DocumentStored,
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateResent { .. }
                | Self::DuplicateBypassed { .. }
                | Self::DuplicateOrphaned { .. }
        )
    }
}

/// Turns inbound messages into store rows and queue admissions.
#[derive(Clone)]
pub struct Intake {
    store: Arc<dyn JobStore>,
    transport: Arc<dyn TransportClient>,
    queue: JobQueue,
    dedup: DedupIndex,
    bypass: Arc<dyn ContentBypass>,
    account: AccountContext,
}

impl Intake {
    pub fn new(
        store: Arc<dyn JobStore>,
        transport: Arc<dyn TransportClient>,
        queue: JobQueue,
        bypass: Arc<dyn ContentBypass>,
        account: AccountContext,
    ) -> Self {
        let dedup = DedupIndex::new(store.clone());
        Self {
            store,
            transport,
            queue,
            dedup,
            bypass,
            account,
        }
    }

    pub async fn handle(&self, message: &InboundMessage) -> Result<IngestOutcome, GridError> {
        match &message.attachment {
            Some(Attachment::Video(video)) => self.handle_video(message.source, video).await,
            Some(Attachment::Document(doc)) => {
                self.handle_document(message.source, doc, message.caption.as_deref())
                    .await
            }
            None => Ok(IngestOutcome::Ignored),
        }
    }

    async fn handle_video(
        &self,
        source: SourceRef,
        video: &VideoMeta,
    ) -> Result<IngestOutcome, GridError> {
        self.store.upsert_video_meta(video).await?;
        self.store
            .upsert_resource_handle(
                FileType::Video,
                &video.content.unique_id,
                &video.content.resource_id,
                &self.account.name,
            )
            .await?;
        self.dedup_or_admit(source, &video.content, FileType::Video)
            .await
    }

    async fn handle_document(
        &self,
        source: SourceRef,
        doc: &DocumentMeta,
        caption: Option<&str>,
    ) -> Result<IngestOutcome, GridError> {
        self.store.upsert_document_meta(doc, caption).await?;
        self.store
            .upsert_resource_handle(
                FileType::Document,
                &doc.content.unique_id,
                &doc.content.resource_id,
                &self.account.name,
            )
            .await?;

        if doc.is_video() {
            return self
                .dedup_or_admit(source, &doc.content, FileType::Document)
                .await;
        }
        self.ack(source, ACK_DOCUMENT_STORED).await;
        Ok(IngestOutcome::DocumentStored)
    }

    async fn dedup_or_admit(
        &self,
        source: SourceRef,
        content: &ContentRef,
        file_type: FileType,
    ) -> Result<IngestOutcome, GridError> {
        let unique_id = content.unique_id.as_str();
        match self.dedup.resolve(unique_id, &self.account.name).await? {
            DedupDecision::SameAccount(handle) => {
                self.transport
                    .send_photo_by_handle(
                        source.chat_id,
                        &handle.resource_id,
                        Some(ACK_THUMBNAIL_EXISTS),
                        Some(source.message_id),
                    )
                    .await?;
                info!(unique_id, thumbnail = %handle.unique_id, "resent existing preview");
                Ok(IngestOutcome::DuplicateResent {
                    thumbnail_unique_id: handle.unique_id,
                })
            }
            DedupDecision::OtherAccount(handle) => {
                let from_account = handle.account_name.clone();
                let thumbnail_unique_id = handle.unique_id.clone();
                let bypass = self.bypass.clone();
                let to_account = self.account.name.clone();
                tokio::spawn(async move {
                    if let Err(e) = bypass
                        .bypass(&handle, &handle.account_name, &to_account)
                        .await
                    {
                        warn!(error = %e, thumbnail = %handle.unique_id, "preview bypass failed");
                    }
                });
                info!(unique_id, from = %from_account, "requested preview from another account");
                Ok(IngestOutcome::DuplicateBypassed {
                    thumbnail_unique_id,
                    from_account,
                })
            }
            DedupDecision::Orphaned {
                thumbnail_unique_id,
            } => {
                warn!(
                    unique_id,
                    thumbnail = %thumbnail_unique_id,
                    "preview recorded but no handle reaches it, not re-admitting"
                );
                self.ack(source, ACK_THUMBNAIL_EXISTS).await;
                Ok(IngestOutcome::DuplicateOrphaned {
                    thumbnail_unique_id,
                })
            }
            DedupDecision::NotFound => {
                let request = AdmitRequest {
                    content: content.clone(),
                    file_type,
                    owner_account: self.account.name.clone(),
                    source,
                };
                match self.queue.admit(&request).await? {
                    AdmitOutcome::Inserted { job_id } => {
                        self.ack(source, ACK_QUEUED).await;
                        Ok(IngestOutcome::Queued {
                            job_id,
                            retry_count: 0,
                        })
                    }
                    AdmitOutcome::Rearmed {
                        job_id,
                        retry_count,
                    } => {
                        self.ack(source, ACK_QUEUED).await;
                        Ok(IngestOutcome::Queued {
                            job_id,
                            retry_count,
                        })
                    }
                    AdmitOutcome::InProgress { job_id, .. } => {
                        Ok(IngestOutcome::InProgress { job_id })
                    }
                    AdmitOutcome::RetryLimitReached { job_id, .. } => {
                        Ok(IngestOutcome::RetryLimitReached { job_id })
                    }
                }
            }
        }
    }

    /// Acks are best-effort; the work they announce already happened.
    async fn ack(&self, source: SourceRef, text: &str) {
        if let Err(e) = self
            .transport
            .send_text(source.chat_id, text, Some(source.message_id))
            .await
        {
            warn!(error = %e, chat_id = source.chat_id, "failed to send acknowledgement");
        }
    }
}

#[cfg(test)]
mod tests {
    use framegrid_core::JobState;
    use framegrid_test_utils::{MockBypass, MockTransport, TestHarness, fixtures};

    use super::*;

    struct Rig {
        harness: TestHarness,
        transport: Arc<MockTransport>,
        bypass: Arc<MockBypass>,
        intake: Intake,
    }

    async fn rig() -> Rig {
        let harness = TestHarness::builder().build().await.unwrap();
        let transport = harness.transport.clone();
        let bypass = harness.bypass.clone();
        let intake = Intake::new(
            harness.store.clone(),
            transport.clone(),
            JobQueue::new(harness.store.clone(), 5),
            bypass.clone(),
            harness.account.clone(),
        );
        Rig {
            harness,
            transport,
            bypass,
            intake,
        }
    }

    #[tokio::test]
    async fn new_video_is_queued_and_acknowledged() {
        let rig = rig().await;
        let msg = fixtures::video_message(7, 100, "vid-a", 90);

        let outcome = rig.intake.handle(&msg).await.unwrap();

        let IngestOutcome::Queued { job_id, retry_count } = outcome else {
            panic!("expected queued, got {outcome:?}");
        };
        assert_eq!(retry_count, 0);
        let job = rig.harness.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.source.message_id, 100);
        assert_eq!(rig.transport.sent_texts(), vec![(7, ACK_QUEUED.to_string())]);
    }

    #[tokio::test]
    async fn same_account_duplicate_resends_preview() {
        let rig = rig().await;
        let store = rig.harness.store.clone();
        store
            .upsert_resource_handle(FileType::Photo, "thumb-a", "photo-res", "gridbot")
            .await
            .unwrap();
        DedupIndex::new(store.clone())
            .record("vid-a", "thumb-a", "gridbot", "photo-res")
            .await
            .unwrap();

        let outcome = rig
            .intake
            .handle(&fixtures::video_message(7, 101, "vid-a", 90))
            .await
            .unwrap();

        assert!(outcome.is_duplicate());
        assert_eq!(store.job_counts().await.unwrap().pending, 0);
        let resent = rig.transport.resent_photos();
        assert_eq!(resent.len(), 1);
        assert_eq!(resent[0].1, "photo-res");
        assert_eq!(resent[0].2.as_deref(), Some(ACK_THUMBNAIL_EXISTS));
    }

    #[tokio::test]
    async fn other_account_duplicate_requests_bypass() {
        let rig = rig().await;
        let store = rig.harness.store.clone();
        store
            .upsert_resource_handle(FileType::Photo, "thumb-a", "their-res", "otherbot")
            .await
            .unwrap();
        DedupIndex::new(store.clone())
            .record("vid-a", "thumb-a", "otherbot", "their-res")
            .await
            .unwrap();

        let outcome = rig
            .intake
            .handle(&fixtures::video_message(7, 102, "vid-a", 90))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::DuplicateBypassed {
                thumbnail_unique_id: "thumb-a".into(),
                from_account: "otherbot".into()
            }
        );
        rig.bypass.wait_for_calls(1).await;
        let calls = rig.bypass.calls();
        assert_eq!(calls[0].1, "otherbot");
        assert_eq!(calls[0].2, "gridbot");
        assert_eq!(store.job_counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn orphaned_duplicate_is_acknowledged_without_a_job() {
        let rig = rig().await;
        let store = rig.harness.store.clone();
        DedupIndex::new(store.clone())
            .record("vid-o", "thumb-o", "gridbot", "gone-res")
            .await
            .unwrap();

        let outcome = rig
            .intake
            .handle(&fixtures::video_message(7, 200, "vid-o", 90))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::DuplicateOrphaned {
                thumbnail_unique_id: "thumb-o".into()
            }
        );
        assert_eq!(
            rig.transport.sent_texts(),
            vec![(7, ACK_THUMBNAIL_EXISTS.to_string())]
        );
        assert!(rig.transport.resent_photos().is_empty());
        assert_eq!(store.job_counts().await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn redelivery_during_processing_is_not_acknowledged_as_queued() {
        let rig = rig().await;
        let first = rig
            .intake
            .handle(&fixtures::video_message(7, 300, "vid-p", 90))
            .await
            .unwrap();
        let IngestOutcome::Queued { job_id, .. } = first else {
            panic!("expected queued, got {first:?}");
        };
        JobQueue::new(rig.harness.store.clone(), 5)
            .claim_next()
            .await
            .unwrap()
            .unwrap();

        let outcome = rig
            .intake
            .handle(&fixtures::video_message(8, 301, "vid-p", 90))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::InProgress { job_id });
        assert_eq!(rig.transport.sent_texts(), vec![(7, ACK_QUEUED.to_string())]);
        let job = rig.harness.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Processing);
        assert_eq!((job.source.chat_id, job.source.message_id), (7, 300));
    }

    #[tokio::test]
    async fn plain_document_is_stored_not_queued() {
        let rig = rig().await;
        let msg = fixtures::document_message(7, 103, "doc-a", "application/pdf");

        let outcome = rig.intake.handle(&msg).await.unwrap();

        assert_eq!(outcome, IngestOutcome::DocumentStored);
        assert_eq!(rig.harness.store.job_counts().await.unwrap().pending, 0);
        let handles = rig
            .harness
            .store
            .resource_handles(FileType::Document, "doc-a")
            .await
            .unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(
            rig.transport.sent_texts(),
            vec![(7, ACK_DOCUMENT_STORED.to_string())]
        );
    }

    #[tokio::test]
    async fn video_document_follows_the_video_flow() {
        let rig = rig().await;
        let msg = fixtures::document_message(7, 104, "doc-v", "video/mp4");

        let outcome = rig.intake.handle(&msg).await.unwrap();

        let IngestOutcome::Queued { job_id, .. } = outcome else {
            panic!("expected queued, got {outcome:?}");
        };
        let job = rig.harness.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.file_type, FileType::Document);
    }

    #[tokio::test]
    async fn failed_ack_does_not_undo_admission() {
        let rig = rig().await;
        rig.transport.fail_sends(true);

        let outcome = rig
            .intake
            .handle(&fixtures::video_message(7, 105, "vid-b", 30))
            .await
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::Queued { .. }));
    }

    #[tokio::test]
    async fn messages_without_attachments_are_ignored() {
        let rig = rig().await;
        let msg = fixtures::text_message(7, 106);
        assert_eq!(rig.intake.handle(&msg).await.unwrap(), IngestOutcome::Ignored);
    }
}
