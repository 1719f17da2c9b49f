// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the framegrid pipeline.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single writer
//! thread provided by `tokio-rusqlite`. Tables: jobs, resource handles,
//! dedup records, cursors, and video/document/photo metadata.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
