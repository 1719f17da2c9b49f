// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for pipeline integration testing.
//!
//! `TestHarness` assembles a temp SQLite store, mock collaborators for every
//! external system, and a config tuned for fast cycles. Pipeline components
//! are wired from its fields by the tests themselves.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use framegrid_config::model::{FramegridConfig, StorageConfig};
use framegrid_core::{AccountContext, GridError, JobStore};
use framegrid_storage::SqliteStore;

use crate::mock_bypass::MockBypass;
use crate::mock_media::{BoxLabelRenderer, MockFrameSource, MockPackager};
use crate::mock_transport::{MockTransport, TEST_ACCOUNT_ID};
use crate::TEST_ACCOUNT;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    frames: Option<MockFrameSource>,
    chunk_size: u64,
    keep_artifacts: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            frames: None,
            chunk_size: 4096,
            keep_artifacts: false,
        }
    }

    /// Replace the default 90-second 64x36 frame source.
    pub fn with_frames(mut self, frames: MockFrameSource) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Set the transfer chunk size.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Keep job artifacts in the work dir after success.
    pub fn keep_artifacts(mut self) -> Self {
        self.keep_artifacts = true;
        self
    }

    /// Build the test harness, creating and initializing the temp store.
    pub async fn build(self) -> Result<TestHarness, GridError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| GridError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = FramegridConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            ..FramegridConfig::default()
        };
        config.transfer.chunk_size = self.chunk_size;
        config.transfer.retry_backoff_ms = 1;
        config.transfer.work_dir = temp_dir.path().join("work");
        config.transfer.keep_artifacts = self.keep_artifacts;
        config.ingest.idle_backoff_secs = 0;
        config.ingest.idle_polls_before_exit = Some(1);
        config.queue.empty_queue_shutdown_secs = 0;

        let store = SqliteStore::new(config.storage.clone());
        store.initialize().await?;

        Ok(TestHarness {
            store: Arc::new(store),
            transport: Arc::new(MockTransport::new()),
            bypass: Arc::new(MockBypass::new()),
            frames: Arc::new(self.frames.unwrap_or_default()),
            label: Arc::new(BoxLabelRenderer::new()),
            packager: Arc::new(MockPackager::new()),
            account: AccountContext {
                name: TEST_ACCOUNT.to_string(),
                id: TEST_ACCOUNT_ID,
            },
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    /// SQLite store on a temp database, already initialized.
    pub store: Arc<SqliteStore>,
    pub transport: Arc<MockTransport>,
    pub bypass: Arc<MockBypass>,
    pub frames: Arc<MockFrameSource>,
    pub label: Arc<BoxLabelRenderer>,
    pub packager: Arc<MockPackager>,
    /// Identity the mock transport reports.
    pub account: AccountContext,
    /// Config pointing at the temp database and work dir.
    pub config: FramegridConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.transfer.work_dir
    }

    /// Path of a file inside the work dir.
    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir().join(name)
    }

    /// Reopen the store after a cycle closed it, as a restarted process would.
    pub async fn reopen_store(&self) -> Result<(), GridError> {
        self.store.initialize().await
    }
}
