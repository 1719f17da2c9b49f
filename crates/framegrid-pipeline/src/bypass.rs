// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default cross-account copy collaborator.

use async_trait::async_trait;
use tracing::info;

use framegrid_core::{
    AdapterType, ContentBypass, GridError, HealthStatus, PluginAdapter, ResourceHandle,
};

/// Records bypass requests in the log and does nothing else. Deployments with
/// a real relay between accounts plug in their own [`ContentBypass`].
#[derive(Debug, Default)]
pub struct LoggingBypass;

#[async_trait]
impl PluginAdapter for LoggingBypass {
    fn name(&self) -> &str {
        "logging-bypass"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bypass
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        Ok(())
    }
}

#[async_trait]
impl ContentBypass for LoggingBypass {
    async fn bypass(
        &self,
        handle: &ResourceHandle,
        from_account: &str,
        to_account: &str,
    ) -> Result<(), GridError> {
        info!(
            unique_id = %handle.unique_id,
            file_type = %handle.file_type,
            from_account,
            to_account,
            "bypass requested"
        );
        Ok(())
    }
}
