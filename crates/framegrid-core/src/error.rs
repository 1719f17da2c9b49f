// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the framegrid pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type used across all collaborator traits and pipeline stages.
#[derive(Debug, Error)]
pub enum GridError {
    /// Configuration errors (missing credentials, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Network or timeout failure talking to the transport. Retryable per
    /// chunk or per batch.
    #[error("transport error: {message}")]
    Transport {
        /// What was being fetched or sent.
        message: String,
        /// The underlying HTTP or Bot API error, when there is one.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The local partial file disagrees with the remote object.
    #[error("transfer gap in {}: {on_disk} bytes on disk, {total} bytes remote", path.display())]
    TransferGap {
        /// The partial download.
        path: PathBuf,
        /// Its length on disk.
        on_disk: u64,
        /// Size the transport reports for the source.
        total: u64,
    },

    /// Sampled frames do not share one resolution. Fatal to the job.
    #[error("frame {index} is {}x{}, expected {}x{}", found.0, found.1, expected.0, expected.1)]
    DimensionMismatch {
        /// Position of the offending frame in sampling order.
        index: usize,
        /// Width and height of the first frame.
        expected: (u32, u32),
        /// Width and height of the offending frame.
        found: (u32, u32),
    },

    /// Frame decoding, image composition, or encoding failed.
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The archive packager failed.
    #[error("archive error: {message}")]
    Archive {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Uploading a produced artifact failed.
    #[error("publish error: {message}")]
    Publish {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The activity observed the shared cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GridError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a media error without an underlying source.
    pub fn media(message: impl Into<String>) -> Self {
        Self::Media {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a retry of the same chunk or batch may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("i/o: {e}"))
    }
}
