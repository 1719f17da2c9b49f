// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `TransportClient` over in-memory objects and
//! scripted update batches. Every outbound send is captured for assertions,
//! and chunk reads, polls, and sends can be made to fail on demand.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use framegrid_core::traits::adapter::PluginAdapter;
use framegrid_core::{
    AccountContext, AdapterType, DownloadSource, GridError, HealthStatus, InboundMessage,
    SentFile, SentPhoto, SourceRef, TransportClient, Update,
};

use crate::TEST_ACCOUNT;

/// Account id reported by [`MockTransport::identity`].
pub const TEST_ACCOUNT_ID: i64 = 1001;

/// A photo uploaded through `send_photo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPhotoCall {
    pub chat_id: i64,
    pub path: PathBuf,
    pub reply_to: Option<i32>,
    pub photo: SentPhoto,
}

/// A document uploaded through `send_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFileCall {
    pub chat_id: i64,
    pub path: PathBuf,
    pub caption: Option<String>,
    /// Size of the file at upload time.
    pub size: u64,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, Vec<u8>>,
    size_overrides: HashMap<String, u64>,
    /// offset -> (remaining failures, transient)
    chunk_faults: HashMap<u64, (u32, bool)>,
    chunk_requests: HashMap<u64, usize>,
    hang_at: HashSet<u64>,
    batches: VecDeque<Vec<Update>>,
    polled: Vec<i64>,
    poll_faults: u32,
    fail_sends: bool,
    seen: HashMap<(i64, i32), InboundMessage>,
    texts: Vec<(i64, String)>,
    resent: Vec<(i64, String, Option<String>)>,
    photos: Vec<SentPhotoCall>,
    files: Vec<SentFileCall>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_send(&self) -> Result<(), GridError> {
        if self.fail_sends {
            return Err(GridError::Publish {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

/// A mock transport for testing.
pub struct MockTransport {
    state: Mutex<State>,
}

impl MockTransport {
    /// Create a transport with no objects and no queued updates.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register the bytes served for `resource_id`.
    pub fn set_object(&self, resource_id: &str, bytes: Vec<u8>) {
        self.state().objects.insert(resource_id.to_string(), bytes);
    }

    /// Advertise `size` for `resource_id` regardless of the stored bytes.
    pub fn set_size_override(&self, resource_id: &str, size: u64) {
        self.state()
            .size_overrides
            .insert(resource_id.to_string(), size);
    }

    /// Fail the next `times` chunk requests at `offset`.
    pub fn fail_chunk_at(&self, offset: u64, times: u32, transient: bool) {
        self.state().chunk_faults.insert(offset, (times, transient));
    }

    /// Make the next chunk request at `offset` never return.
    pub fn hang_at(&self, offset: u64) {
        self.state().hang_at.insert(offset);
    }

    /// Number of chunk requests seen at `offset`.
    pub fn chunk_requests_at(&self, offset: u64) -> usize {
        self.state()
            .chunk_requests
            .get(&offset)
            .copied()
            .unwrap_or(0)
    }

    /// Total chunk requests across all offsets.
    pub fn chunk_request_count(&self) -> usize {
        self.state().chunk_requests.values().sum()
    }

    /// Queue one batch for a later `fetch_updates_since`.
    pub fn push_updates(&self, batch: Vec<Update>) {
        self.state().batches.push_back(batch);
    }

    /// Offsets passed to every poll so far.
    pub fn polled_offsets(&self) -> Vec<i64> {
        self.state().polled.clone()
    }

    /// Fail the next `n` polls with a transient error.
    pub fn fail_next_polls(&self, n: u32) {
        self.state().poll_faults = n;
    }

    /// Make every send operation fail until switched off again.
    pub fn fail_sends(&self, fail: bool) {
        self.state().fail_sends = fail;
    }

    pub fn sent_texts(&self) -> Vec<(i64, String)> {
        self.state().texts.clone()
    }

    /// Photos re-sent by handle as `(chat_id, resource_id, caption)`.
    pub fn resent_photos(&self) -> Vec<(i64, String, Option<String>)> {
        self.state().resent.clone()
    }

    pub fn sent_photos(&self) -> Vec<SentPhotoCall> {
        self.state().photos.clone()
    }

    pub fn sent_files(&self) -> Vec<SentFileCall> {
        self.state().files.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        Ok(())
    }
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn identity(&self) -> Result<AccountContext, GridError> {
        Ok(AccountContext {
            name: TEST_ACCOUNT.to_string(),
            id: TEST_ACCOUNT_ID,
        })
    }

    async fn fetch_updates_since(
        &self,
        offset: i64,
        limit: u32,
        _timeout: Duration,
    ) -> Result<Vec<Update>, GridError> {
        let mut state = self.state();
        state.polled.push(offset);
        if state.poll_faults > 0 {
            state.poll_faults -= 1;
            return Err(GridError::transport("mock poll timed out"));
        }
        let Some(batch) = state.batches.pop_front() else {
            return Ok(Vec::new());
        };
        let updates: Vec<Update> = batch
            .into_iter()
            .filter(|u| u.offset >= offset)
            .take(limit as usize)
            .collect();
        for msg in updates.iter().filter_map(|u| u.message.as_ref()) {
            state
                .seen
                .insert((msg.source.chat_id, msg.source.message_id), msg.clone());
        }
        Ok(updates)
    }

    async fn get_message(&self, source: SourceRef) -> Result<InboundMessage, GridError> {
        self.state()
            .seen
            .get(&(source.chat_id, source.message_id))
            .cloned()
            .ok_or_else(|| {
                GridError::Internal(format!(
                    "message {}/{} was never observed",
                    source.chat_id, source.message_id
                ))
            })
    }

    async fn source_size(&self, source: &DownloadSource) -> Result<u64, GridError> {
        let state = self.state();
        let id = &source.content.resource_id;
        if let Some(size) = state.size_overrides.get(id) {
            return Ok(*size);
        }
        state
            .objects
            .get(id)
            .map(|b| b.len() as u64)
            .ok_or_else(|| GridError::Internal(format!("unknown object {id}")))
    }

    async fn download_chunk(
        &self,
        source: &DownloadSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, GridError> {
        let hang = {
            let mut state = self.state();
            *state.chunk_requests.entry(offset).or_insert(0) += 1;
            if let Some((remaining, transient)) = state.chunk_faults.get_mut(&offset)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(if *transient {
                    GridError::transport(format!("mock timeout at offset {offset}"))
                } else {
                    GridError::Internal(format!("mock read failure at offset {offset}"))
                });
            }
            state.hang_at.remove(&offset)
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let state = self.state();
        let id = &source.content.resource_id;
        let bytes = state
            .objects
            .get(id)
            .ok_or_else(|| GridError::Internal(format!("unknown object {id}")))?;
        let start = (offset as usize).min(bytes.len());
        let end = offset.saturating_add(limit).min(bytes.len() as u64) as usize;
        Ok(bytes[start..end].to_vec())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_path: &Path,
        reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError> {
        self.state().check_send()?;
        let (width, height) = image::image_dimensions(image_path).map_err(|e| GridError::Publish {
            message: format!("unreadable photo {}", image_path.display()),
            source: Some(Box::new(e)),
        })?;
        let size = tokio::fs::metadata(image_path).await?.len();

        let mut state = self.state();
        let n = state.next_id();
        let photo = SentPhoto {
            resource_id: format!("photo-res-{n}"),
            unique_id: format!("photo-uid-{n}"),
            size: Some(size),
            width,
            height,
        };
        state.photos.push(SentPhotoCall {
            chat_id,
            path: image_path.to_path_buf(),
            reply_to,
            photo: photo.clone(),
        });
        Ok(photo)
    }

    async fn send_photo_by_handle(
        &self,
        chat_id: i64,
        resource_id: &str,
        caption: Option<&str>,
        _reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError> {
        let mut state = self.state();
        state.check_send()?;
        let n = state.next_id();
        state.resent.push((
            chat_id,
            resource_id.to_string(),
            caption.map(str::to_string),
        ));
        Ok(SentPhoto {
            resource_id: resource_id.to_string(),
            unique_id: format!("resent-uid-{n}"),
            size: None,
            width: 0,
            height: 0,
        })
    }

    async fn send_file(
        &self,
        chat_id: i64,
        file_path: &Path,
        _reply_to: Option<i32>,
        caption: Option<&str>,
    ) -> Result<SentFile, GridError> {
        self.state().check_send()?;
        let size = tokio::fs::metadata(file_path).await?.len();

        let mut state = self.state();
        let n = state.next_id();
        state.files.push(SentFileCall {
            chat_id,
            path: file_path.to_path_buf(),
            caption: caption.map(str::to_string),
            size,
        });
        Ok(SentFile {
            resource_id: format!("file-res-{n}"),
            unique_id: format!("file-uid-{n}"),
            message_id: n as i32,
        })
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        _reply_to: Option<i32>,
    ) -> Result<(), GridError> {
        let mut state = self.state();
        state.check_send()?;
        state.texts.push((chat_id, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use framegrid_core::{ContentRef, SourceRef};

    use super::*;
    use crate::fixtures;

    fn source(resource_id: &str) -> DownloadSource {
        DownloadSource {
            content: ContentRef {
                resource_id: resource_id.into(),
                unique_id: "u".into(),
            },
            origin: SourceRef {
                chat_id: 1,
                message_id: 1,
            },
            size_hint: None,
        }
    }

    #[tokio::test]
    async fn chunks_are_served_from_the_object() {
        let t = MockTransport::new();
        t.set_object("r", (0u8..10).collect());
        let s = source("r");
        assert_eq!(t.source_size(&s).await.unwrap(), 10);
        assert_eq!(t.download_chunk(&s, 4, 4).await.unwrap(), vec![4, 5, 6, 7]);
        assert_eq!(t.download_chunk(&s, 8, 4).await.unwrap(), vec![8, 9]);
        assert!(t.download_chunk(&s, 12, 4).await.unwrap().is_empty());
        assert_eq!(t.chunk_request_count(), 3);
    }

    #[tokio::test]
    async fn polls_skip_offsets_below_the_request() {
        let t = MockTransport::new();
        t.push_updates(vec![
            fixtures::update(3, fixtures::text_message(1, 3)),
            fixtures::update(4, fixtures::text_message(1, 4)),
        ]);
        let got = t
            .fetch_updates_since(4, 10, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert!(
            t.fetch_updates_since(5, 10, Duration::ZERO)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(t.polled_offsets(), vec![4, 5]);
        let msg = t
            .get_message(SourceRef {
                chat_id: 1,
                message_id: 4,
            })
            .await
            .unwrap();
        assert_eq!(msg.source.message_id, 4);
    }

    #[tokio::test]
    async fn failing_sends_are_not_recorded() {
        let t = MockTransport::new();
        t.fail_sends(true);
        assert!(t.send_text(1, "hi", None).await.is_err());
        t.fail_sends(false);
        t.send_text(1, "hi", None).await.unwrap();
        assert_eq!(t.sent_texts(), vec![(1, "hi".to_string())]);
    }
}
