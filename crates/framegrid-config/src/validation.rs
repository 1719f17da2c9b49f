// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use framegrid_core::types::{TRANSFER_GRANULE, TRANSFER_WINDOW, is_valid_chunk_size};

use crate::diagnostic::ConfigError;
use crate::model::FramegridConfig;

/// Validates a deserialized configuration, collecting every failure.
pub fn validate_config(config: &FramegridConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let chunk = config.transfer.chunk_size;
    if !is_valid_chunk_size(chunk) {
        fail(format!(
            "transfer.chunk_size must be a multiple of {TRANSFER_GRANULE} that divides \
             {TRANSFER_WINDOW}, got {chunk}"
        ));
    }

    if config.grid.rows == 0 {
        fail("grid.rows must be at least 1".to_string());
    }
    if config.grid.cols == 0 {
        fail("grid.cols must be at least 1".to_string());
    }

    let ratio = config.grid.watermark_height_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        fail(format!(
            "grid.watermark_height_ratio must be in (0, 1], got {ratio}"
        ));
    }

    if config.grid.watermark_opacity > 255 {
        fail(format!(
            "grid.watermark_opacity must be between 0 and 255, got {}",
            config.grid.watermark_opacity
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.telegram.poll_limit == 0 || config.telegram.poll_limit > 100 {
        fail(format!(
            "telegram.poll_limit must be between 1 and 100, got {}",
            config.telegram.poll_limit
        ));
    }

    if config.transfer.work_dir.as_os_str().is_empty() {
        fail("transfer.work_dir must not be empty".to_string());
    }

    if let Some(password) = &config.archive.password
        && password.is_empty()
    {
        fail("archive.password must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
