// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every section rejects unknown keys so typos fail at startup instead of
//! being silently ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level framegrid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FramegridConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    /// Bot API credentials and polling.
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Preview grid layout and watermark.
    #[serde(default)]
    pub grid: GridConfig,

    /// Chunked download and ephemeral file handling.
    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    /// Encrypted archive bundle.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required by `run`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Maximum updates per polled batch.
    #[serde(default = "default_poll_limit")]
    pub poll_limit: u32,

    /// Long-poll timeout in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: default_api_url(),
            poll_limit: default_poll_limit(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_limit() -> u32 {
    100
}

fn default_poll_timeout_secs() -> u64 {
    5
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("framegrid").join("framegrid.db"))
        .unwrap_or_else(|| PathBuf::from("framegrid.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// Grid layout and watermark settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    #[serde(default = "default_grid_side")]
    pub rows: u32,

    #[serde(default = "default_grid_side")]
    pub cols: u32,

    /// TrueType font used for the watermark. A missing file disables it.
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    /// Distance of the watermark from the bottom-right corner.
    #[serde(default = "default_watermark_margin_px")]
    pub watermark_margin_px: u32,

    /// Text height as a fraction of one frame's height.
    #[serde(default = "default_watermark_height_ratio")]
    pub watermark_height_ratio: f32,

    /// Watermark alpha, 0 (invisible) to 255 (opaque).
    #[serde(default = "default_watermark_opacity")]
    pub watermark_opacity: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_grid_side(),
            cols: default_grid_side(),
            font_path: default_font_path(),
            watermark_margin_px: default_watermark_margin_px(),
            watermark_height_ratio: default_watermark_height_ratio(),
            watermark_opacity: default_watermark_opacity(),
        }
    }
}

fn default_grid_side() -> u32 {
    3
}

fn default_font_path() -> PathBuf {
    PathBuf::from("fonts/Roboto_Condensed-Regular.ttf")
}

fn default_watermark_margin_px() -> u32 {
    10
}

fn default_watermark_height_ratio() -> f32 {
    0.05
}

fn default_watermark_opacity() -> u16 {
    128
}

/// Chunked transfer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// Bytes per chunk request. Must be a multiple of 4096 that divides 1 MiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Transient failures tolerated per chunk before the download gives up.
    #[serde(default = "default_chunk_retries")]
    pub chunk_retries: u32,

    /// Base retry delay, doubled on every attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Directory for in-flight downloads, previews, and archives.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Keep the downloaded video, preview, and archive after a job succeeds.
    #[serde(default)]
    pub keep_artifacts: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_retries: default_chunk_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            work_dir: default_work_dir(),
            keep_artifacts: false,
        }
    }
}

fn default_chunk_size() -> u64 {
    framegrid_core::types::DEFAULT_CHUNK_SIZE
}

fn default_chunk_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("temp")
}

/// Update polling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Delay after an empty batch before polling again.
    #[serde(default = "default_idle_backoff_secs")]
    pub idle_backoff_secs: u64,

    /// When set, ingestion ends after this many consecutive empty polls.
    #[serde(default)]
    pub idle_polls_before_exit: Option<u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            idle_backoff_secs: default_idle_backoff_secs(),
            idle_polls_before_exit: None,
        }
    }
}

fn default_idle_backoff_secs() -> u64 {
    1
}

/// Job queue settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// How long the worker waits on an empty queue before ending the cycle.
    #[serde(default = "default_empty_queue_shutdown_secs")]
    pub empty_queue_shutdown_secs: u64,

    /// Re-admission stops re-arming a job once its retry count reaches this.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Processing jobs started longer ago than this are reclaimed.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            empty_queue_shutdown_secs: default_empty_queue_shutdown_secs(),
            max_retries: default_max_retries(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_empty_queue_shutdown_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_stale_after_secs() -> u64 {
    3600
}

/// Archive bundle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fixed archive password. Defaults to the source content's unique id.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            password: None,
        }
    }
}
