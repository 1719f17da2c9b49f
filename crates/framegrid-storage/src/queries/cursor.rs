// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling cursor persistence.

use framegrid_core::{Cursor, GridError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn load(db: &Database, source_id: i64, scope: i64) -> Result<Option<Cursor>, GridError> {
    db.connection()
        .call(move |conn| -> Result<Option<Cursor>, rusqlite::Error> {
            conn.query_row(
                "SELECT source_id, scope, last_offset, updated_at FROM cursors
                 WHERE source_id = ?1 AND scope = ?2",
                params![source_id, scope],
                |row| {
                    Ok(Cursor {
                        source_id: row.get(0)?,
                        scope: row.get(1)?,
                        last_offset: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Stores `offset` unless the persisted value is already at or beyond it.
/// Returns true when a row was inserted or moved forward.
pub async fn advance(
    db: &Database,
    source_id: i64,
    scope: i64,
    offset: i64,
) -> Result<bool, GridError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO cursors (source_id, scope, last_offset) VALUES (?1, ?2, ?3)
                 ON CONFLICT (source_id, scope) DO UPDATE SET
                     last_offset = excluded.last_offset,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE excluded.last_offset > cursors.last_offset",
                params![source_id, scope, offset],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
