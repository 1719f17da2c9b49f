// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! The SQL files under `migrations/` are compiled in with refinery, which
//! records applied versions in `refinery_schema_history`.

use framegrid_core::GridError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every pending migration.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), GridError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| GridError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        tracing::debug!(version = migration.version(), name = migration.name(), "migration applied");
    }
    Ok(())
}
