// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FFmpeg-backed frame source.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use framegrid_core::{AdapterType, FrameSource, GridError, HealthStatus, PluginAdapter};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parses the duration out of `ffprobe -show_entries format=duration -of json`.
pub(crate) fn parse_probe_duration(stdout: &[u8]) -> Result<f64, GridError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout).map_err(|e| GridError::Media {
        message: "unreadable ffprobe output".to_string(),
        source: Some(Box::new(e)),
    })?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| GridError::media("ffprobe reported no duration"))
}

fn require_tool(tool: &str) -> Result<(), GridError> {
    which::which(tool)
        .map(|_| ())
        .map_err(|e| GridError::Media {
            message: format!("{tool} not found in PATH"),
            source: Some(Box::new(e)),
        })
}

fn tool_failed(tool: &str, stderr: &[u8]) -> GridError {
    GridError::media(format!(
        "{tool} failed: {}",
        String::from_utf8_lossy(stderr).trim()
    ))
}

fn spawn_err(tool: &str, e: std::io::Error) -> GridError {
    GridError::Media {
        message: format!("failed to run {tool}"),
        source: Some(Box::new(e)),
    }
}

/// Extracts frames by shelling out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Default)]
pub struct FfmpegFrameSource;

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PluginAdapter for FfmpegFrameSource {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::FrameSource
    }

    async fn health_check(&self) -> Result<HealthStatus, GridError> {
        for tool in ["ffprobe", "ffmpeg"] {
            if which::which(tool).is_err() {
                return Ok(HealthStatus::Unhealthy(format!("{tool} not found in PATH")));
            }
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GridError> {
        Ok(())
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn probe_duration(&self, video: &Path) -> Result<f64, GridError> {
        require_tool("ffprobe")?;

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(video)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_err("ffprobe", e))?;

        if !output.status.success() {
            return Err(tool_failed("ffprobe", &output.stderr));
        }
        parse_probe_duration(&output.stdout)
    }

    async fn frame_at(&self, video: &Path, at_secs: f64) -> Result<RgbaImage, GridError> {
        require_tool("ffmpeg")?;

        // -ss before -i seeks on keyframes, then decodes forward to the instant.
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{at_secs:.3}"), "-i"])
            .arg(video)
            .args([
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_err("ffmpeg", e))?;

        if !output.status.success() {
            return Err(tool_failed("ffmpeg", &output.stderr));
        }
        if output.stdout.is_empty() {
            return Err(GridError::media(format!(
                "no frame at {at_secs:.3}s in {}",
                video.display()
            )));
        }

        let png = output.stdout;
        let frame = tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&png, ImageFormat::Png).map(|img| img.into_rgba8())
        })
        .await
        .map_err(|e| GridError::Internal(format!("frame decode task failed: {e}")))?
        .map_err(|e| GridError::Media {
            message: format!("undecodable frame at {at_secs:.3}s"),
            source: Some(Box::new(e)),
        })?;

        debug!(at_secs, width = frame.width(), height = frame.height(), "decoded frame");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_probe_json() {
        let json = br#"{"format": {"duration": "90.040000"}}"#;
        let d = parse_probe_duration(json).unwrap();
        assert!((d - 90.04).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_a_media_error() {
        let err = parse_probe_duration(br#"{"format": {}}"#).unwrap_err();
        assert!(matches!(err, GridError::Media { .. }));
        let err = parse_probe_duration(b"not json").unwrap_err();
        assert!(err.to_string().contains("ffprobe"));
    }

    #[test]
    fn failed_tool_error_carries_stderr() {
        let err = tool_failed("ffmpeg", b"moov atom not found\n");
        assert_eq!(err.to_string(), "media error: ffmpeg failed: moov atom not found");
    }
}
