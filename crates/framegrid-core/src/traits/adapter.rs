// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every collaborator.

use async_trait::async_trait;

use crate::error::GridError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle, and health check for a pipeline collaborator.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of collaborator this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, GridError>;

    /// Releases any held session, connection, or process handle.
    async fn shutdown(&self) -> Result<(), GridError>;
}
