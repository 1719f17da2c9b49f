// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source content to canonical thumbnail mapping.
//!
//! Lookups key on the source `unique_id`, never on a resource id: resource ids
//! are account-scoped and differ for the same bytes.

use std::sync::Arc;

use tracing::debug;

use framegrid_core::{DedupRecord, FileType, GridError, JobStore, ResourceHandle};

/// What to do with content that may already have a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    /// No preview yet; admit a job.
    NotFound,
    /// This account can resend the preview directly.
    SameAccount(ResourceHandle),
    /// Only another account holds the preview; ask it to copy it over.
    OtherAccount(ResourceHandle),
    /// A preview was recorded but no account holds a handle to it.
    Orphaned { thumbnail_unique_id: String },
}

#[derive(Clone)]
pub struct DedupIndex {
    store: Arc<dyn JobStore>,
}

impl DedupIndex {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// The recorded canonical preview for `unique_id`, if any.
    pub async fn lookup_thumbnail(&self, unique_id: &str) -> Result<Option<DedupRecord>, GridError> {
        self.store.find_dedup_record(unique_id).await
    }

    /// Decides how `account` should answer for `unique_id`. A handle owned by
    /// `account` wins over handles owned by anyone else.
    pub async fn resolve(&self, unique_id: &str, account: &str) -> Result<DedupDecision, GridError> {
        let Some(record) = self.lookup_thumbnail(unique_id).await? else {
            return Ok(DedupDecision::NotFound);
        };
        let handles = self
            .store
            .resource_handles(FileType::Photo, &record.thumbnail_unique_id)
            .await?;
        debug!(
            unique_id,
            thumbnail = %record.thumbnail_unique_id,
            handles = handles.len(),
            "dedup hit"
        );

        if let Some(own) = handles.iter().find(|h| h.account_name == account) {
            return Ok(DedupDecision::SameAccount(own.clone()));
        }
        Ok(match handles.into_iter().next() {
            Some(other) => DedupDecision::OtherAccount(other),
            None => DedupDecision::Orphaned {
                thumbnail_unique_id: record.thumbnail_unique_id,
            },
        })
    }

    /// Records that `original_unique_id` is previewed by `thumbnail_unique_id`.
    /// New mappings start unconfirmed with status 1.
    pub async fn record(
        &self,
        original_unique_id: &str,
        thumbnail_unique_id: &str,
        owner_account: &str,
        resource_id: &str,
    ) -> Result<(), GridError> {
        self.store
            .upsert_dedup_record(&DedupRecord {
                original_unique_id: original_unique_id.to_string(),
                thumbnail_unique_id: thumbnail_unique_id.to_string(),
                owner_account: owner_account.to_string(),
                resource_id: resource_id.to_string(),
                confirmed: false,
                status: 1,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use framegrid_test_utils::TestHarness;

    use super::*;

    #[tokio::test]
    async fn unknown_content_is_not_found() {
        let harness = TestHarness::builder().build().await.unwrap();
        let index = DedupIndex::new(harness.store.clone());
        assert_eq!(
            index.resolve("nope", "gridbot").await.unwrap(),
            DedupDecision::NotFound
        );
    }

    #[tokio::test]
    async fn own_handle_wins_over_foreign_ones() {
        let harness = TestHarness::builder().build().await.unwrap();
        let store = harness.store.clone();
        let index = DedupIndex::new(store.clone());
        index.record("vid", "thumb", "otherbot", "r-other").await.unwrap();
        store
            .upsert_resource_handle(FileType::Photo, "thumb", "r-other", "otherbot")
            .await
            .unwrap();
        store
            .upsert_resource_handle(FileType::Photo, "thumb", "r-mine", "gridbot")
            .await
            .unwrap();

        match index.resolve("vid", "gridbot").await.unwrap() {
            DedupDecision::SameAccount(h) => assert_eq!(h.resource_id, "r-mine"),
            other => panic!("expected same-account hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn foreign_handle_requests_a_bypass() {
        let harness = TestHarness::builder().build().await.unwrap();
        let store = harness.store.clone();
        let index = DedupIndex::new(store.clone());
        index.record("vid", "thumb", "otherbot", "r-other").await.unwrap();
        store
            .upsert_resource_handle(FileType::Photo, "thumb", "r-other", "otherbot")
            .await
            .unwrap();

        match index.resolve("vid", "gridbot").await.unwrap() {
            DedupDecision::OtherAccount(h) => assert_eq!(h.account_name, "otherbot"),
            other => panic!("expected other-account hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn record_without_handles_is_orphaned() {
        let harness = TestHarness::builder().build().await.unwrap();
        let index = DedupIndex::new(harness.store.clone());
        index.record("vid", "thumb", "gridbot", "r").await.unwrap();

        assert_eq!(
            index.resolve("vid", "gridbot").await.unwrap(),
            DedupDecision::Orphaned {
                thumbnail_unique_id: "thumb".to_string()
            }
        );
        let record = index.lookup_thumbnail("vid").await.unwrap().unwrap();
        assert_eq!(record.status, 1);
        assert!(!record.confirmed);
    }
}
