// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per table group.

pub mod cursor;
pub mod dedup;
pub mod handles;
pub mod jobs;
pub mod media;

/// SQL expression for the current UTC time in the stored text format.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";
