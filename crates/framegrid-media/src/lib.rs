// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media processing for framegrid.
//!
//! Keyframe sampling and grid composition, the ffmpeg frame source, the font
//! watermark, perceptual hashing, and the zip archive packager.

pub mod archive;
pub mod ffmpeg;
pub mod fingerprint;
pub mod grid;
pub mod label;

pub use archive::ZipPackager;
pub use ffmpeg::FfmpegFrameSource;
pub use fingerprint::{ContentFingerprinter, PerceptualHash, hamming};
pub use grid::{ComposedGrid, GridComposer, cell_origin, sample_timestamps};
pub use label::{FontLabelRenderer, LabelStyle};
