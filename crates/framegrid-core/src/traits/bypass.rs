// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-account content copy contract.

use async_trait::async_trait;

use crate::error::GridError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ResourceHandle;

/// Asks another account to make `handle` available to this one.
///
/// Callers fire and forget; the result is only logged.
#[async_trait]
pub trait ContentBypass: PluginAdapter {
    async fn bypass(
        &self,
        handle: &ResourceHandle,
        from_account: &str,
        to_account: &str,
    ) -> Result<(), GridError>;
}
