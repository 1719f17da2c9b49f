// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for framegrid integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a live bot, ffmpeg, or zip.
//!
//! # Components
//!
//! - [`MockTransport`] - In-memory objects, scripted update batches, captured sends
//! - [`MockBypass`] - Captures cross-account bypass requests
//! - [`MockFrameSource`] - Solid frames of a fixed size
//! - [`BoxLabelRenderer`] - Paints a box where the watermark would go
//! - [`MockPackager`] - Writes placeholder archives
//! - [`TestHarness`] - Temp store plus all of the above

pub mod fixtures;
pub mod harness;
pub mod mock_bypass;
pub mod mock_media;
pub mod mock_transport;

pub use harness::TestHarness;
pub use mock_bypass::MockBypass;
pub use mock_media::{BoxLabelRenderer, MockFrameSource, MockPackager, PackageCall};
pub use mock_transport::{MockTransport, SentFileCall, SentPhotoCall, TEST_ACCOUNT_ID};

/// Account name reported by [`MockTransport`] and used by [`TestHarness`].
pub const TEST_ACCOUNT: &str = "gridbot";
