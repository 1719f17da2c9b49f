// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semi-transparent text watermark rendered with a TrueType font.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, warn};

use framegrid_config::model::GridConfig;
use framegrid_core::{AdapterType, GridError, HealthStatus, LabelRenderer, PluginAdapter};

/// Placement and blending parameters for the watermark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Gap between the text box and the canvas's right and bottom edges.
    pub margin_px: u32,
    /// Font pixel height as a fraction of one frame's height.
    pub height_ratio: f32,
    /// Alpha of the white fill, 0..=255.
    pub opacity: u8,
}

impl LabelStyle {
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            margin_px: config.watermark_margin_px,
            height_ratio: config.watermark_height_ratio,
            opacity: config.watermark_opacity.min(255) as u8,
        }
    }

    /// Font size for frames `frame_height` pixels tall, never below one pixel.
    pub fn font_px(&self, frame_height: u32) -> f32 {
        (frame_height as f32 * self.height_ratio).floor().max(1.0)
    }
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            margin_px: 10,
            height_ratio: 0.05,
            opacity: 128,
        }
    }
}

/// Blends white at `coverage * opacity` over the pixel at `(x, y)`.
fn blend_white(canvas: &mut RgbaImage, x: i64, y: i64, coverage: f32, opacity: u8) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * f32::from(opacity) / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let dst = f32::from(px[channel]);
        px[channel] = (255.0 * alpha + dst * (1.0 - alpha)).round() as u8;
    }
}

/// Watermark renderer backed by a font loaded from disk.
pub struct FontLabelRenderer {
    font: FontVec,
    style: LabelStyle,
}

impl FontLabelRenderer {
    pub fn from_bytes(bytes: Vec<u8>, style: LabelStyle) -> Result<Self, GridError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| GridError::Media {
            message: "invalid font data".to_string(),
            source: Some(Box::new(e)),
        })?;
        Ok(Self { font, style })
    }

    pub fn load(path: &Path, style: LabelStyle) -> Result<Self, GridError> {
        let bytes = std::fs::read(path).map_err(|e| GridError::Media {
            message: format!("cannot read font {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::from_bytes(bytes, style)
    }

    /// Loads the configured font, or returns `None` with a warning so grids
    /// are still produced without a watermark.
    pub fn load_optional(config: &GridConfig) -> Option<Self> {
        match Self::load(&config.font_path, LabelStyle::from_config(config)) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                warn!(error = %e, "watermark font unavailable, grids will be unlabelled");
                None
            }
        }
    }

    /// Width of `text` in pixels and the scaled ascent/descent at `scale`.
    fn measure(&self, text: &str, scale: PxScale) -> (f32, f32, f32) {
        let scaled = self.font.as_scaled(scale);
        let mut width = 0.0;
        let mut previous = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        (width, scaled.ascent(), scaled.descent())
    }
}

#[async_trait]
impl PluginAdapter for FontLabelRenderer {
    fn name(&self) -> &str {
        "font-label"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LabelRenderer
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        Ok(())
    }
}

impl LabelRenderer for FontLabelRenderer {
    fn render(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        frame_height: u32,
    ) -> Result<(), GridError> {
        if text.is_empty() {
            return Ok(());
        }
        let scale = PxScale::from(self.style.font_px(frame_height));
        let (text_w, ascent, descent) = self.measure(text, scale);
        let text_h = ascent - descent;
        let margin = self.style.margin_px as f32;

        let left = canvas.width() as f32 - text_w - margin;
        let top = canvas.height() as f32 - text_h - margin;
        let baseline = top + ascent;
        debug!(text, left, top, size = scale.y, "stamping watermark");

        let scaled = self.font.as_scaled(scale);
        let mut caret = left;
        let mut previous = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outline) = self.font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                let origin_x = bounds.min.x as i64;
                let origin_y = bounds.min.y as i64;
                outline.draw(|gx, gy, coverage| {
                    blend_white(
                        canvas,
                        origin_x + i64::from(gx),
                        origin_y + i64::from(gy),
                        coverage,
                        self.style.opacity,
                    );
                });
            }
        }
        Ok(())
    }
}
