// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The framegrid job pipeline.
//!
//! - [`IngestionCursor`] polls the update stream and hands each message to
//!   [`Intake`], which short-circuits through the [`DedupIndex`] or admits a
//!   job into the [`JobQueue`].
//! - [`JobWorker`] claims one job, pulls the video with the
//!   [`ResumableDownloader`], composes and publishes the preview, and records
//!   the mapping.
//! - [`Orchestrator`] races the two for one batch cycle.

pub mod bypass;
pub mod cursor;
pub mod dedup;
pub mod download;
pub mod intake;
pub mod orchestrator;
pub mod queue;
pub mod shutdown;
pub mod worker;

pub use bypass::LoggingBypass;
pub use cursor::{BatchReport, CURSOR_SCOPE, IngestSummary, IngestionCursor, PollSettings};
pub use dedup::{DedupDecision, DedupIndex};
pub use download::{FetchReport, ResumableDownloader};
pub use intake::{IngestOutcome, Intake};
pub use orchestrator::{Activity, Collaborators, CycleReport, Orchestrator};
pub use queue::JobQueue;
pub use shutdown::install_signal_handler;
pub use worker::{CycleOutcome, JobArtifacts, JobWorker, WorkerSettings};
