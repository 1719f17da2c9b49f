// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyframe grid composition.
//!
//! A video of duration `D` sampled into an `R x C` grid yields `N = R * C`
//! frames at `(i + 1) * D / (N + 1)`, so neither the first nor the last
//! frame of the file is ever used. Frames are laid out row-major.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info};

use framegrid_core::{FrameSource, GridError, LabelRenderer};

/// Evenly spaced sample instants strictly inside `(0, duration)`.
pub fn sample_timestamps(duration: f64, count: u32) -> Vec<f64> {
    let slots = f64::from(count) + 1.0;
    (0..count)
        .map(|i| (f64::from(i) + 1.0) * duration / slots)
        .collect()
}

/// Top-left pixel of cell `index` in a grid `cols` wide of `width x height`
/// cells.
pub fn cell_origin(index: u32, cols: u32, width: u32, height: u32) -> (u32, u32) {
    ((index % cols) * width, (index / cols) * height)
}

/// Pastes `frames` row-major into one canvas of `cols * w` by `rows * h`.
///
/// Every frame must match the first one's resolution.
pub fn tile(frames: &[RgbaImage], rows: u32, cols: u32) -> Result<RgbaImage, GridError> {
    let expected = rows as usize * cols as usize;
    if frames.len() != expected {
        return Err(GridError::media(format!(
            "expected {expected} frames for a {rows}x{cols} grid, got {}",
            frames.len()
        )));
    }
    let (w, h) = frames[0].dimensions();
    let mut canvas = RgbaImage::new(w * cols, h * rows);
    for (index, frame) in frames.iter().enumerate() {
        check_dimensions(index, (w, h), frame)?;
        let (x, y) = cell_origin(index as u32, cols, w, h);
        image::imageops::replace(&mut canvas, frame, i64::from(x), i64::from(y));
    }
    Ok(canvas)
}

fn check_dimensions(index: usize, expected: (u32, u32), frame: &RgbaImage) -> Result<(), GridError> {
    let found = frame.dimensions();
    if found != expected {
        return Err(GridError::DimensionMismatch {
            index,
            expected,
            found,
        });
    }
    Ok(())
}

/// A grid image written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedGrid {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Height of one cell, which the label size is derived from.
    pub frame_height: u32,
}

/// Samples frames from a video and tiles them into a labelled JPEG.
pub struct GridComposer {
    frames: Arc<dyn FrameSource>,
    label: Option<Arc<dyn LabelRenderer>>,
}

impl GridComposer {
    pub fn new(frames: Arc<dyn FrameSource>, label: Option<Arc<dyn LabelRenderer>>) -> Self {
        Self { frames, label }
    }

    /// Composes a `rows x cols` grid of `video` into `dest`, stamping
    /// `label` in the bottom-right corner when a renderer is configured.
    ///
    /// Frame extraction stops at the first frame whose resolution differs
    /// from the first one. Tiling and encoding run on a blocking thread.
    pub async fn compose(
        &self,
        video: &Path,
        rows: u32,
        cols: u32,
        label: &str,
        dest: &Path,
    ) -> Result<ComposedGrid, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Config(format!(
                "grid must have at least one row and column, got {rows}x{cols}"
            )));
        }

        let duration = self.frames.probe_duration(video).await?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(GridError::media(format!(
                "{} has no usable duration ({duration})",
                video.display()
            )));
        }

        let times = sample_timestamps(duration, rows * cols);
        let mut frames: Vec<RgbaImage> = Vec::with_capacity(times.len());
        for (index, at) in times.iter().enumerate() {
            let frame = self.frames.frame_at(video, *at).await?;
            if let Some(first) = frames.first() {
                check_dimensions(index, first.dimensions(), &frame)?;
            }
            debug!(index, at, "sampled frame");
            frames.push(frame);
        }

        let renderer = self.label.clone();
        let text = label.to_string();
        let dest_owned = dest.to_path_buf();
        let grid = tokio::task::spawn_blocking(move || -> Result<ComposedGrid, GridError> {
            let frame_height = frames[0].height();
            let mut canvas = tile(&frames, rows, cols)?;
            if let Some(renderer) = renderer {
                renderer.render(&mut canvas, &text, frame_height)?;
            }
            let (width, height) = canvas.dimensions();
            DynamicImage::ImageRgba8(canvas)
                .into_rgb8()
                .save_with_format(&dest_owned, ImageFormat::Jpeg)
                .map_err(|e| GridError::Media {
                    message: format!("failed to write {}", dest_owned.display()),
                    source: Some(Box::new(e)),
                })?;
            Ok(ComposedGrid {
                path: dest_owned,
                width,
                height,
                frame_height,
            })
        })
        .await
        .map_err(|e| GridError::Internal(format!("grid composition task failed: {e}")))??;

        info!(
            path = %grid.path.display(),
            width = grid.width,
            height = grid.height,
            "composed keyframe grid"
        );
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use framegrid_core::{AdapterType, HealthStatus, PluginAdapter};
    use image::Rgba;

    use super::*;

    struct SolidFrames {
        duration: f64,
        size: (u32, u32),
        odd_one_out: Option<usize>,
        requested: Mutex<Vec<f64>>,
    }

    impl SolidFrames {
        fn new(duration: f64, size: (u32, u32)) -> Self {
            Self {
                duration,
                size,
                odd_one_out: None,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PluginAdapter for SolidFrames {
        fn name(&self) -> &str {
            "solid"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::FrameSource
        }
        async fn health_check(&self) -> Result<HealthStatus, GridError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), GridError> {
            Ok(())
        }
    }

    #[async_trait]
    impl FrameSource for SolidFrames {
        async fn probe_duration(&self, _video: &Path) -> Result<f64, GridError> {
            Ok(self.duration)
        }

        async fn frame_at(&self, _video: &Path, at_secs: f64) -> Result<RgbaImage, GridError> {
            let mut requested = self.requested.lock().unwrap();
            let index = requested.len();
            requested.push(at_secs);
            let (w, h) = if self.odd_one_out == Some(index) {
                (self.size.0 / 2, self.size.1 / 2)
            } else {
                self.size
            };
            let shade = (index * 25) as u8;
            Ok(RgbaImage::from_pixel(w, h, Rgba([shade, shade, shade, 255])))
        }
    }

    #[test]
    fn timestamps_skip_both_ends() {
        let times = sample_timestamps(90.0, 9);
        assert_eq!(times, vec![9.0, 18.0, 27.0, 36.0, 45.0, 54.0, 63.0, 72.0, 81.0]);
        assert!(sample_timestamps(10.0, 0).is_empty());
    }

    #[test]
    fn cells_are_row_major() {
        assert_eq!(cell_origin(0, 3, 100, 50), (0, 0));
        assert_eq!(cell_origin(2, 3, 100, 50), (200, 0));
        assert_eq!(cell_origin(3, 3, 100, 50), (0, 50));
        assert_eq!(cell_origin(8, 3, 100, 50), (200, 100));
    }

    #[test]
    fn tile_places_each_frame_in_its_cell() {
        let frames: Vec<RgbaImage> = (0..4u8)
            .map(|i| RgbaImage::from_pixel(4, 2, Rgba([i * 50, 0, 0, 255])))
            .collect();
        let canvas = tile(&frames, 2, 2).unwrap();
        assert_eq!(canvas.dimensions(), (8, 4));
        assert_eq!(canvas.get_pixel(0, 0)[0], 0);
        assert_eq!(canvas.get_pixel(5, 1)[0], 50);
        assert_eq!(canvas.get_pixel(1, 3)[0], 100);
        assert_eq!(canvas.get_pixel(7, 3)[0], 150);
    }

    #[test]
    fn tile_rejects_mixed_resolutions() {
        let frames = vec![RgbaImage::new(4, 4), RgbaImage::new(4, 4), RgbaImage::new(2, 4)];
        let err = tile(&frames, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            GridError::DimensionMismatch {
                index: 2,
                expected: (4, 4),
                found: (2, 4)
            }
        ));
    }

    #[tokio::test]
    async fn compose_writes_a_jpeg_of_the_full_grid() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(SolidFrames::new(100.0, (32, 18)));
        let composer = GridComposer::new(source.clone(), None);
        let dest = dir.path().join("grid.jpg");

        let grid = composer
            .compose(Path::new("in.mp4"), 3, 3, "uid", &dest)
            .await
            .unwrap();

        assert_eq!((grid.width, grid.height), (96, 54));
        assert_eq!(grid.frame_height, 18);
        let written = image::open(&dest).unwrap();
        assert_eq!((written.width(), written.height()), (96, 54));
        assert_eq!(source.requested.lock().unwrap().len(), 9);
        assert_eq!(source.requested.lock().unwrap()[0], 10.0);
    }

    #[tokio::test]
    async fn compose_stops_at_the_first_mismatched_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = SolidFrames::new(100.0, (32, 18));
        source.odd_one_out = Some(4);
        let source = Arc::new(source);
        let composer = GridComposer::new(source.clone(), None);
        let dest = dir.path().join("grid.jpg");

        let err = composer
            .compose(Path::new("in.mp4"), 3, 3, "uid", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, GridError::DimensionMismatch { index: 4, .. }));
        assert_eq!(source.requested.lock().unwrap().len(), 5);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn compose_rejects_zero_duration() {
        let dir = tempfile::tempdir().unwrap();
        let composer = GridComposer::new(Arc::new(SolidFrames::new(0.0, (8, 8))), None);
        let err = composer
            .compose(Path::new("in.mp4"), 2, 2, "uid", &dir.path().join("g.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Media { .. }));
    }

    #[tokio::test]
    async fn compose_rejects_empty_layout() {
        let composer = GridComposer::new(Arc::new(SolidFrames::new(5.0, (8, 8))), None);
        let err = composer
            .compose(Path::new("in.mp4"), 0, 3, "uid", Path::new("g.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }
}
