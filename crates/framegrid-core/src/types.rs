// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by every framegrid component.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Minimal transfer granule of the block-addressed download protocol.
pub const TRANSFER_GRANULE: u64 = 4096;

/// Window that every chunk size must evenly divide.
pub const TRANSFER_WINDOW: u64 = 1024 * 1024;

/// Default chunk size: 128 KiB, eight chunks per window.
pub const DEFAULT_CHUNK_SIZE: u64 = 131_072;

/// Returns true if `chunk_size` is a multiple of [`TRANSFER_GRANULE`] and
/// evenly divides [`TRANSFER_WINDOW`].
pub fn is_valid_chunk_size(chunk_size: u64) -> bool {
    chunk_size > 0
        && chunk_size % TRANSFER_GRANULE == 0
        && TRANSFER_WINDOW % chunk_size == 0
}

/// Kind of media a content identity refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Video,
    Document,
    Photo,
}

/// Canonical, account-independent identity of a piece of media.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentIdentity {
    pub unique_id: String,
    pub kind: FileType,
}

/// The pair a job needs to fetch its content: the account-scoped resource id
/// and the stable unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub resource_id: String,
    pub unique_id: String,
}

/// Where a piece of content was observed: the conversation and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// An account-scoped handle used to fetch or resend a file.
///
/// `(file_type, unique_id, account_name)` is unique; many handles may share
/// one `unique_id`. Never a dedup key across accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub file_type: FileType,
    pub unique_id: String,
    pub resource_id: String,
    pub account_name: String,
    pub created_at: String,
}

/// Lifecycle state of a job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobState {
    /// Done and failed are terminal; only a fresh admission leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A persisted unit of grid-composition work, one row per `unique_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub content: ContentRef,
    pub file_type: FileType,
    pub owner_account: String,
    pub state: JobState,
    pub scheduled_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub retry_count: u32,
    pub source: SourceRef,
    pub result_handle: Option<String>,
    pub last_error: Option<String>,
}

/// Everything needed to admit a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitRequest {
    pub content: ContentRef,
    pub file_type: FileType,
    pub owner_account: String,
    pub source: SourceRef,
}

/// Result of an idempotent admission upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A new row was created at `retry_count = 0`.
    Inserted { job_id: i64 },
    /// An existing row was re-armed and its retry count bumped.
    Rearmed { job_id: i64, retry_count: u32 },
    /// The row is claimed right now. Its retry count was bumped; its source
    /// reference was kept.
    InProgress { job_id: i64, retry_count: u32 },
    /// The existing row already used up its retry budget and was left alone.
    RetryLimitReached { job_id: i64, retry_count: u32 },
}

impl AdmitOutcome {
    pub fn job_id(&self) -> i64 {
        match *self {
            Self::Inserted { job_id }
            | Self::Rearmed { job_id, .. }
            | Self::InProgress { job_id, .. }
            | Self::RetryLimitReached { job_id, .. } => job_id,
        }
    }
}

/// Number of jobs in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: u64,
    pub processing: u64,
    pub done: u64,
    pub failed: u64,
}

/// Canonical preview mapping: `original_unique_id` was already rendered as
/// `thumbnail_unique_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    pub original_unique_id: String,
    pub thumbnail_unique_id: String,
    pub owner_account: String,
    pub resource_id: String,
    pub confirmed: bool,
    pub status: i32,
}

/// Persisted polling position, one row per `(source_id, scope)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub source_id: i64,
    pub scope: i64,
    pub last_offset: i64,
    pub updated_at: String,
}

/// Video attachment metadata as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub content: ContentRef,
    pub size: Option<u64>,
    pub duration_secs: u32,
    pub width: u32,
    pub height: u32,
    pub mime_type: Option<String>,
}

/// Document attachment metadata as observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub content: ContentRef,
    pub size: Option<u64>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

impl DocumentMeta {
    /// Documents carrying a video MIME type are gridded like videos.
    pub fn is_video(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("video/"))
    }
}

/// The attachment kinds the pipeline acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    Video(VideoMeta),
    Document(DocumentMeta),
}

/// A message as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub source: SourceRef,
    pub caption: Option<String>,
    pub attachment: Option<Attachment>,
}

/// One entry of the polled update stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub offset: i64,
    pub message: Option<InboundMessage>,
}

/// What the downloader needs to pull a binary object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSource {
    pub content: ContentRef,
    pub origin: SourceRef,
    pub size_hint: Option<u64>,
}

/// Result of uploading a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentPhoto {
    pub resource_id: String,
    pub unique_id: String,
    pub size: Option<u64>,
    pub width: u32,
    pub height: u32,
}

/// Result of uploading a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentFile {
    pub resource_id: String,
    pub unique_id: String,
    pub message_id: i32,
}

/// Persisted metadata of a produced preview photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub unique_id: String,
    pub size: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub phash: Option<String>,
}

/// Process-wide identity of the account this instance runs as.
///
/// Resolved once at startup and passed explicitly into every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub name: String,
    pub id: i64,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Store,
    FrameSource,
    LabelRenderer,
    Archive,
    Bypass,
}
