// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resumable chunked download.
//!
//! The destination file's length is the resume point: every chunk is written
//! and flushed before the next is requested, so after any failure the file
//! holds exactly the bytes that were appended. On restart a partial trailing
//! chunk is cut back to the last chunk boundary, keeping request offsets
//! aligned for block-addressed transports.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use framegrid_config::model::TransferConfig;
use framegrid_core::types::is_valid_chunk_size;
use framegrid_core::{DownloadSource, GridError, TransportClient};

/// Progress callback invoked with `(offset, total)` after every chunk.
pub type Progress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Result of one [`ResumableDownloader::fetch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Offset the transfer resumed from after any realignment.
    pub resumed_from: u64,
    /// Bytes appended by this call.
    pub written: u64,
    /// Remote object size.
    pub total: u64,
}

impl FetchReport {
    /// Final on-disk length.
    pub fn on_disk(&self) -> u64 {
        self.resumed_from + self.written
    }
}

/// Where the next transfer must start, given what is already on disk.
///
/// Returns `Err` with the reason when the partial file cannot be trusted as-is
/// and must be cut back to the returned offset.
pub(crate) fn resume_point(
    on_disk: u64,
    total: u64,
    chunk_size: u64,
) -> Result<u64, (u64, &'static str)> {
    if on_disk > total {
        return Err((0, "partial file is larger than the remote object"));
    }
    if on_disk == total || on_disk % chunk_size == 0 {
        return Ok(on_disk);
    }
    Err((on_disk - on_disk % chunk_size, "partial file ends mid-chunk"))
}

/// Pulls a remote object into a local file in fixed-size chunks.
pub struct ResumableDownloader {
    transport: Arc<dyn TransportClient>,
    chunk_size: u64,
    chunk_retries: u32,
    retry_backoff: Duration,
}

impl ResumableDownloader {
    pub fn new(transport: Arc<dyn TransportClient>, chunk_size: u64) -> Result<Self, GridError> {
        if !is_valid_chunk_size(chunk_size) {
            return Err(GridError::Config(format!(
                "chunk size {chunk_size} must be a multiple of 4096 that divides 1 MiB"
            )));
        }
        Ok(Self {
            transport,
            chunk_size,
            chunk_retries: 0,
            retry_backoff: Duration::from_millis(500),
        })
    }

    pub fn from_config(
        transport: Arc<dyn TransportClient>,
        config: &TransferConfig,
    ) -> Result<Self, GridError> {
        Ok(Self::new(transport, config.chunk_size)?
            .with_retry(config.chunk_retries, Duration::from_millis(config.retry_backoff_ms)))
    }

    /// Retries each chunk up to `retries` times on transient errors, waiting
    /// `backoff`, then twice that, and so on.
    pub fn with_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.chunk_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Downloads `source` into `dest`, resuming from whatever is already there.
    ///
    /// Stops when the file reaches the remote size or the transport returns an
    /// empty chunk. Cancellation is observed before every chunk request.
    pub async fn fetch(
        &self,
        source: &DownloadSource,
        dest: &Path,
        cancel: &CancellationToken,
        progress: Option<Progress<'_>>,
    ) -> Result<FetchReport, GridError> {
        let total = self.transport.source_size(source).await?;
        let on_disk = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(io_err(dest, e)),
        };

        let start = match resume_point(on_disk, total, self.chunk_size) {
            Ok(offset) => offset,
            Err((offset, reason)) => {
                let gap = GridError::TransferGap {
                    path: dest.to_path_buf(),
                    on_disk,
                    total,
                };
                warn!(error = %gap, reason, restart_at = offset, "realigning partial download");
                offset
            }
        };

        let mut file = if start == 0 {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(dest)
                .await
                .map_err(|e| io_err(dest, e))?
        } else {
            let file = OpenOptions::new()
                .append(true)
                .open(dest)
                .await
                .map_err(|e| io_err(dest, e))?;
            if start != on_disk {
                file.set_len(start).await.map_err(|e| io_err(dest, e))?;
            }
            file
        };

        if start > 0 {
            info!(path = %dest.display(), offset = start, total, "resuming download");
        }

        let mut offset = start;
        while offset < total {
            if cancel.is_cancelled() {
                return Err(GridError::Cancelled);
            }
            let mut chunk = self.chunk_with_retry(source, offset, cancel).await?;
            if chunk.is_empty() {
                debug!(offset, total, "transport returned no bytes, ending early");
                break;
            }
            chunk.truncate(self.chunk_size as usize);

            file.write_all(&chunk).await.map_err(|e| io_err(dest, e))?;
            file.flush().await.map_err(|e| io_err(dest, e))?;
            offset += chunk.len() as u64;

            debug!(offset, total, "chunk written");
            if let Some(report) = progress {
                report(offset, total);
            }
        }
        file.sync_all().await.map_err(|e| io_err(dest, e))?;

        let report = FetchReport {
            resumed_from: start,
            written: offset - start,
            total,
        };
        info!(
            path = %dest.display(),
            written = report.written,
            on_disk = report.on_disk(),
            total,
            "download finished"
        );
        Ok(report)
    }

    async fn chunk_with_retry(
        &self,
        source: &DownloadSource,
        offset: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, GridError> {
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(GridError::Cancelled),
                r = self.transport.download_chunk(source, offset, self.chunk_size) => r,
            };
            match result {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && attempt < self.chunk_retries => {
                    let delay = self.retry_backoff.saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        error = %e,
                        offset,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "chunk failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(GridError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn io_err(path: &Path, e: std::io::Error) -> GridError {
    GridError::Internal(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use framegrid_core::{ContentRef, SourceRef};
    use framegrid_test_utils::MockTransport;

    use super::*;

    const CHUNK: u64 = 4096;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn source() -> DownloadSource {
        DownloadSource {
            content: ContentRef {
                resource_id: "res-1".into(),
                unique_id: "uid-1".into(),
            },
            origin: SourceRef {
                chat_id: 1,
                message_id: 1,
            },
            size_hint: None,
        }
    }

    fn downloader(transport: Arc<MockTransport>) -> ResumableDownloader {
        ResumableDownloader::new(transport, CHUNK)
            .unwrap()
            .with_retry(2, Duration::from_millis(1))
    }

    #[test]
    fn resume_point_rules() {
        assert_eq!(resume_point(0, 10_000, CHUNK), Ok(0));
        assert_eq!(resume_point(8192, 10_000, CHUNK), Ok(8192));
        assert_eq!(resume_point(10_000, 10_000, CHUNK), Ok(10_000));
        assert_eq!(resume_point(9000, 10_000, CHUNK).unwrap_err().0, 8192);
        assert_eq!(resume_point(20_000, 10_000, CHUNK).unwrap_err().0, 0);
    }

    #[test]
    fn rejects_misaligned_chunk_sizes() {
        let transport = Arc::new(MockTransport::new());
        assert!(ResumableDownloader::new(transport.clone(), 1000).is_err());
        assert!(ResumableDownloader::new(transport, 3 * 4096).is_err());
    }

    #[tokio::test]
    async fn single_pass_download_matches_source() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(10_000);
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());

        let seen = std::sync::Mutex::new(Vec::new());
        let record = |o: u64, t: u64| seen.lock().unwrap().push((o, t));
        let report = downloader(transport)
            .fetch(&source(), &dest, &CancellationToken::new(), Some(&record))
            .await
            .unwrap();

        assert_eq!(report.written, 10_000);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(4096, 10_000), (8192, 10_000), (10_000, 10_000)]
        );
    }

    #[tokio::test]
    async fn resume_after_failure_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(5 * 4096 + 123);
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());
        // Third chunk fails permanently on the first attempt.
        transport.fail_chunk_at(8192, 1, false);

        let err = downloader(transport.clone())
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 8192);

        let report = downloader(transport)
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.resumed_from, 8192);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[tokio::test]
    async fn crash_mid_chunk_neither_duplicates_nor_drops_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(4 * 4096);
        // Simulate a crash that left a chunk and a half on disk.
        std::fs::write(&dest, &data[..4096 + 1500]).unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());

        let report = downloader(transport)
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.resumed_from, 4096);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[tokio::test]
    async fn oversized_partial_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        std::fs::write(&dest, vec![7u8; 9000]).unwrap();
        let data = payload(5000);
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());

        let report = downloader(transport)
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.resumed_from, 0);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[tokio::test]
    async fn transient_chunk_errors_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(3 * 4096);
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());
        transport.fail_chunk_at(4096, 2, true);

        downloader(transport.clone())
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), data);
        assert_eq!(transport.chunk_requests_at(4096), 3);
    }

    #[tokio::test]
    async fn empty_chunk_is_a_clean_early_end() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(4096);
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());
        // Advertise more than the object actually holds.
        transport.set_size_override("res-1", 3 * 4096);

        let report = downloader(transport)
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.written, 4096);
        assert_eq!(report.total, 3 * 4096);
    }

    #[tokio::test]
    async fn complete_file_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let data = payload(5000);
        std::fs::write(&dest, &data).unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", data.clone());

        let report = downloader(transport.clone())
            .fetch(&source(), &dest, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(transport.chunk_requests_at(0), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let transport = Arc::new(MockTransport::new());
        transport.set_object("res-1", payload(3 * 4096));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = downloader(transport)
            .fetch(&source(), &dest, &cancel, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Cancelled));
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 0);
    }
}
