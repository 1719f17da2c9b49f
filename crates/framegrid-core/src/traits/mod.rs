// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every collaborator extends the [`PluginAdapter`] base trait and uses
//! `#[async_trait]` so the pipeline can hold them as trait objects.

pub mod adapter;
pub mod archive;
pub mod bypass;
pub mod media;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use archive::ArchivePackager;
pub use bypass::ContentBypass;
pub use media::{FrameSource, LabelRenderer};
pub use store::JobStore;
pub use transport::TransportClient;
