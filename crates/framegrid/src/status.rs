// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `framegrid status` and `framegrid reclaim` command implementations.
//!
//! Both work on the database alone and never contact the Bot API.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use framegrid_config::model::FramegridConfig;
use framegrid_core::{GridError, JobCounts, JobStore};
use framegrid_pipeline::{CURSOR_SCOPE, JobQueue};
use framegrid_storage::SqliteStore;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub pending: u64,
    pub processing: u64,
    pub done: u64,
    pub failed: u64,
    /// `None` when no token is configured or nothing was polled yet.
    pub cursor_offset: Option<i64>,
}

/// The numeric bot id is the token prefix before the colon.
fn bot_id(token: Option<&str>) -> Option<i64> {
    token?.split_once(':')?.0.parse().ok()
}

async fn open_store(config: &FramegridConfig) -> Result<Arc<dyn JobStore>, GridError> {
    let store: Arc<dyn JobStore> = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    Ok(store)
}

async fn collect(
    store: &dyn JobStore,
    config: &FramegridConfig,
) -> Result<StatusResponse, GridError> {
    let JobCounts {
        pending,
        processing,
        done,
        failed,
    } = store.job_counts().await?;
    let cursor_offset = match bot_id(config.telegram.bot_token.as_deref()) {
        Some(id) => store
            .load_cursor(id, CURSOR_SCOPE)
            .await?
            .map(|c| c.last_offset),
        None => None,
    };
    Ok(StatusResponse {
        pending,
        processing,
        done,
        failed,
        cursor_offset,
    })
}

/// Run the `framegrid status` command.
pub async fn run_status(config: &FramegridConfig, json: bool) -> Result<(), GridError> {
    let store = open_store(config).await?;
    let result = collect(store.as_ref(), config).await;
    store.close().await?;
    let status = result?;

    if json {
        let out = serde_json::to_string_pretty(&status)
            .map_err(|e| GridError::Internal(format!("failed to render status: {e}")))?;
        println!("{out}");
    } else {
        println!("jobs:");
        println!("  pending     {}", status.pending);
        println!("  processing  {}", status.processing);
        println!("  done        {}", status.done);
        println!("  failed      {}", status.failed);
        match status.cursor_offset {
            Some(offset) => println!("cursor offset: {offset}"),
            None => println!("cursor offset: unknown"),
        }
    }
    Ok(())
}

/// Run the `framegrid reclaim` command.
pub async fn run_reclaim(
    config: &FramegridConfig,
    older_than_secs: Option<u64>,
) -> Result<(), GridError> {
    let older_than =
        Duration::from_secs(older_than_secs.unwrap_or(config.queue.stale_after_secs));
    let store = open_store(config).await?;
    let result = JobQueue::new(store.clone(), config.queue.max_retries)
        .reclaim_stale(older_than)
        .await;
    store.close().await?;
    println!("reclaimed {} job(s)", result?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use framegrid_config::model::StorageConfig;

    use super::*;

    #[test]
    fn bot_id_comes_from_the_token_prefix() {
        assert_eq!(bot_id(Some("123456:AAE-secret")), Some(123456));
        assert_eq!(bot_id(Some("no-colon")), None);
        assert_eq!(bot_id(Some("abc:def")), None);
        assert_eq!(bot_id(None), None);
    }

    #[tokio::test]
    async fn status_reads_counts_and_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FramegridConfig {
            storage: StorageConfig {
                database_path: dir.path().join("s.db").to_string_lossy().to_string(),
                wal_mode: true,
            },
            ..FramegridConfig::default()
        };
        config.telegram.bot_token = Some("77:tok".into());

        let store = open_store(&config).await.unwrap();
        store.advance_cursor(77, CURSOR_SCOPE, 41).await.unwrap();
        let status = collect(store.as_ref(), &config).await.unwrap();
        store.close().await.unwrap();

        assert_eq!(status.pending, 0);
        assert_eq!(status.cursor_offset, Some(41));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["cursor_offset"], 41);
    }

    #[tokio::test]
    async fn reclaim_on_an_empty_database_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = FramegridConfig {
            storage: StorageConfig {
                database_path: dir.path().join("r.db").to_string_lossy().to_string(),
                wal_mode: true,
            },
            ..FramegridConfig::default()
        };
        run_reclaim(&config, Some(0)).await.unwrap();
    }
}
