// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive packager trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::GridError;
use crate::traits::adapter::PluginAdapter;

/// Packs files into a password-protected, store-only archive.
#[async_trait]
pub trait ArchivePackager: PluginAdapter {
    /// Writes `files` into `dest`, replacing any archive already there.
    async fn package_encrypted(
        &self,
        files: &[PathBuf],
        dest: &Path,
        password: &str,
    ) -> Result<(), GridError>;
}
