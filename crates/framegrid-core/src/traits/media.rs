// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame decoding and label rendering collaborators.

use std::path::Path;

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::GridError;
use crate::traits::adapter::PluginAdapter;

/// Decodes single frames out of a local video file.
#[async_trait]
pub trait FrameSource: PluginAdapter {
    /// Duration of the video in seconds.
    async fn probe_duration(&self, video: &Path) -> Result<f64, GridError>;

    /// Decodes the frame shown at `at_secs`.
    async fn frame_at(&self, video: &Path, at_secs: f64) -> Result<RgbaImage, GridError>;
}

/// Draws a text label onto a composed image.
///
/// Called from a blocking thread, so implementations must not await.
pub trait LabelRenderer: PluginAdapter {
    /// Draws `text` anchored at the bottom-right corner of `canvas`, sized
    /// relative to `frame_height`.
    fn render(&self, canvas: &mut RgbaImage, text: &str, frame_height: u32)
    -> Result<(), GridError>;
}
