// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `framegrid run` command implementation.
//!
//! Opens the store and the Bot API session, resolves the account identity,
//! wires the real collaborators into an [`Orchestrator`], and runs one cycle.
//! Both shared resources are released on every path, including startup
//! failures after they were acquired.

use std::sync::Arc;

use tracing::{error, info, warn};

use framegrid_config::model::FramegridConfig;
use framegrid_core::{
    FrameSource, GridError, HealthStatus, JobStore, LabelRenderer, PluginAdapter,
    TransportClient,
};
use framegrid_media::{FfmpegFrameSource, FontLabelRenderer, ZipPackager};
use framegrid_pipeline::{
    Collaborators, CycleReport, LoggingBypass, Orchestrator, install_signal_handler,
};
use framegrid_storage::SqliteStore;
use framegrid_telegram::TelegramTransport;

/// Runs one cycle against the configured bot and database.
pub async fn run_cycle(config: FramegridConfig) -> Result<CycleReport, GridError> {
    info!("starting framegrid cycle");

    let store: Arc<dyn JobStore> = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let transport: Arc<dyn TransportClient> = match TelegramTransport::new(config.telegram.clone())
    {
        Ok(t) => Arc::new(t),
        Err(e) => {
            if let Err(close) = store.close().await {
                error!(error = %close, "store close failed");
            }
            return Err(e);
        }
    };

    let orchestrator = match assemble(&config, store.clone(), transport.clone()).await {
        Ok(o) => o,
        Err(e) => {
            release(store.as_ref(), transport.as_ref()).await;
            return Err(e);
        }
    };

    let shutdown = install_signal_handler();
    let report = orchestrator.run(&shutdown).await;
    // Stops the signal listener task.
    shutdown.cancel();
    Ok(report)
}

async fn assemble(
    config: &FramegridConfig,
    store: Arc<dyn JobStore>,
    transport: Arc<dyn TransportClient>,
) -> Result<Orchestrator, GridError> {
    let account = transport.identity().await?;
    info!(account = %account.name, id = account.id, "resolved account identity");

    let frames = Arc::new(FfmpegFrameSource::default());
    log_health(frames.as_ref()).await;
    let packager = Arc::new(ZipPackager::default());
    if config.archive.enabled {
        log_health(packager.as_ref()).await;
    }
    let label = FontLabelRenderer::load_optional(&config.grid)
        .map(|r| Arc::new(r) as Arc<dyn LabelRenderer>);

    Orchestrator::from_config(
        config,
        account,
        Collaborators {
            store,
            transport,
            frames: frames as Arc<dyn FrameSource>,
            label,
            packager,
            bypass: Arc::new(LoggingBypass),
        },
    )
}

/// Missing tools fail jobs later, not the cycle.
async fn log_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => {}
        Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), %reason, "collaborator not ready");
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "health check failed"),
    }
}

async fn release(store: &dyn JobStore, transport: &dyn TransportClient) {
    if let Err(e) = transport.shutdown().await {
        warn!(error = %e, "transport shutdown failed");
    }
    if let Err(e) = store.close().await {
        error!(error = %e, "store close failed");
    }
}
