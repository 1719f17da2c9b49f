// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport client trait: update polling, chunked download, and publishing.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GridError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AccountContext, DownloadSource, InboundMessage, SentFile, SentPhoto, SourceRef, Update,
};

/// One session against the messaging network, owned by a single process.
///
/// Network and timeout failures surface as [`GridError::Transport`] so callers
/// can retry at chunk or batch granularity.
#[async_trait]
pub trait TransportClient: PluginAdapter {
    /// Resolves the account this session is authenticated as.
    async fn identity(&self) -> Result<AccountContext, GridError>;

    /// Fetches at most `limit` updates with offset `>= offset`, long-polling
    /// for up to `timeout` when none are queued.
    async fn fetch_updates_since(
        &self,
        offset: i64,
        limit: u32,
        timeout: Duration,
    ) -> Result<Vec<Update>, GridError>;

    /// Re-fetches a previously observed message.
    async fn get_message(&self, source: SourceRef) -> Result<InboundMessage, GridError>;

    /// Total size in bytes of the object behind `source`.
    async fn source_size(&self, source: &DownloadSource) -> Result<u64, GridError>;

    /// Reads up to `limit` bytes starting at `offset`. An empty result means
    /// the object has no more bytes.
    async fn download_chunk(
        &self,
        source: &DownloadSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, GridError>;

    /// Uploads a local image as a photo, optionally replying to a message.
    async fn send_photo(
        &self,
        chat_id: i64,
        image_path: &Path,
        reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError>;

    /// Re-sends an already uploaded photo by its resource id.
    async fn send_photo_by_handle(
        &self,
        chat_id: i64,
        resource_id: &str,
        caption: Option<&str>,
        reply_to: Option<i32>,
    ) -> Result<SentPhoto, GridError>;

    /// Uploads a local file as a document.
    async fn send_file(
        &self,
        chat_id: i64,
        file_path: &Path,
        reply_to: Option<i32>,
        caption: Option<&str>,
    ) -> Result<SentFile, GridError>;

    /// Sends a short text message.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), GridError>;
}
