// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock media collaborators: frame source, label renderer, and packager.
//!
//! None of them shell out, so tests run without ffmpeg, fonts, or zip.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use framegrid_core::traits::adapter::PluginAdapter;
use framegrid_core::{
    AdapterType, ArchivePackager, FrameSource, GridError, HealthStatus, LabelRenderer,
};

macro_rules! mock_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, GridError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), GridError> {
                Ok(())
            }
        }
    };
}

/// Serves solid frames of one size for any non-empty video file.
///
/// Each frame gets a distinct shade so tiled grids are not uniform.
pub struct MockFrameSource {
    duration: f64,
    width: u32,
    height: u32,
    /// Index of a requested frame that comes back at half size.
    odd_one_out: Option<usize>,
    requested: Mutex<Vec<f64>>,
}

impl MockFrameSource {
    pub fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            duration,
            width,
            height,
            odd_one_out: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Return the `index`-th requested frame at a different resolution.
    pub fn with_mismatched_frame(mut self, index: usize) -> Self {
        self.odd_one_out = Some(index);
        self
    }

    /// Timestamps passed to `frame_at`, in call order.
    pub fn requested_timestamps(&self) -> Vec<f64> {
        self.requested
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    async fn check_video(video: &Path) -> Result<(), GridError> {
        let meta = tokio::fs::metadata(video)
            .await
            .map_err(|e| GridError::Media {
                message: format!("cannot open {}", video.display()),
                source: Some(Box::new(e)),
            })?;
        if meta.len() == 0 {
            return Err(GridError::media(format!("{} is empty", video.display())));
        }
        Ok(())
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new(90.0, 64, 36)
    }
}

mock_adapter!(MockFrameSource, "mock-frames", AdapterType::FrameSource);

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn probe_duration(&self, video: &Path) -> Result<f64, GridError> {
        Self::check_video(video).await?;
        Ok(self.duration)
    }

    async fn frame_at(&self, video: &Path, at_secs: f64) -> Result<RgbaImage, GridError> {
        Self::check_video(video).await?;
        let index = {
            let mut requested = self.requested.lock().unwrap_or_else(|p| p.into_inner());
            requested.push(at_secs);
            requested.len() - 1
        };
        let (w, h) = if self.odd_one_out == Some(index) {
            (self.width / 2, self.height / 2)
        } else {
            (self.width, self.height)
        };
        let shade = (index as u8).wrapping_mul(23);
        Ok(RgbaImage::from_pixel(w, h, Rgba([shade, 40, 90, 255])))
    }
}

/// Paints an opaque white box in the bottom-right corner instead of text.
#[derive(Default)]
pub struct BoxLabelRenderer {
    rendered: Mutex<Vec<(String, u32)>>,
}

impl BoxLabelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(text, frame_height)` of every render call.
    pub fn rendered(&self) -> Vec<(String, u32)> {
        self.rendered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

mock_adapter!(BoxLabelRenderer, "box-label", AdapterType::LabelRenderer);

impl LabelRenderer for BoxLabelRenderer {
    fn render(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        frame_height: u32,
    ) -> Result<(), GridError> {
        self.rendered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((text.to_string(), frame_height));
        let side = (frame_height / 20).max(1);
        let w = (side * text.chars().count() as u32).min(canvas.width());
        let h = side.min(canvas.height());
        for y in canvas.height() - h..canvas.height() {
            for x in canvas.width() - w..canvas.width() {
                canvas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        Ok(())
    }
}

/// One `package_encrypted` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCall {
    pub files: Vec<PathBuf>,
    pub dest: PathBuf,
    pub password: String,
}

/// Writes a placeholder archive listing the packed file names.
#[derive(Default)]
pub struct MockPackager {
    calls: Mutex<Vec<PackageCall>>,
    fail: Mutex<bool>,
}

impl MockPackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock().unwrap_or_else(|p| p.into_inner()) = fail;
    }

    pub fn calls(&self) -> Vec<PackageCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

mock_adapter!(MockPackager, "mock-packager", AdapterType::Archive);

#[async_trait]
impl ArchivePackager for MockPackager {
    async fn package_encrypted(
        &self,
        files: &[PathBuf],
        dest: &Path,
        password: &str,
    ) -> Result<(), GridError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(PackageCall {
                files: files.to_vec(),
                dest: dest.to_path_buf(),
                password: password.to_string(),
            });
        if *self.fail.lock().unwrap_or_else(|p| p.into_inner()) {
            return Err(GridError::Archive {
                message: "mock packager failure".to_string(),
                source: None,
            });
        }

        let mut body = b"PK\x03\x04".to_vec();
        for file in files {
            if !tokio::fs::try_exists(file).await? {
                return Err(GridError::Archive {
                    message: format!("missing input {}", file.display()),
                    source: None,
                });
            }
            body.extend_from_slice(file.to_string_lossy().as_bytes());
            body.push(b'\n');
        }
        tokio::fs::write(dest, body).await?;
        Ok(())
    }
}
