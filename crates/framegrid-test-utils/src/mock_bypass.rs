// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock cross-account bypass that captures requests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use framegrid_core::traits::adapter::PluginAdapter;
use framegrid_core::{AdapterType, ContentBypass, GridError, HealthStatus, ResourceHandle};

/// Captures `(handle, from_account, to_account)` for every bypass request.
///
/// Intake spawns bypass requests without awaiting them, so tests call
/// [`MockBypass::wait_for_calls`] before asserting.
#[derive(Default)]
pub struct MockBypass {
    calls: Mutex<Vec<(ResourceHandle, String, String)>>,
    notify: Notify,
}

impl MockBypass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(ResourceHandle, String, String)> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Wait until at least `n` calls were captured. Panics after five seconds.
    pub async fn wait_for_calls(&self, n: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.notify.notified();
                if self.calls.lock().unwrap_or_else(|p| p.into_inner()).len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {n} bypass calls");
    }
}

#[async_trait]
impl PluginAdapter for MockBypass {
    fn name(&self) -> &str {
        "mock-bypass"
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
impl ContentBypass for MockBypass {
    async fn bypass(
        &self,
        handle: &ResourceHandle,
        from_account: &str,
        to_account: &str,
    ) -> Result<(), GridError> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push((
            handle.clone(),
            from_account.to_string(),
            to_account.to_string(),
        ));
        self.notify.notify_waiters();
        Ok(())
    }
}
