// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedup records: source unique id to canonical thumbnail.

use framegrid_core::{DedupRecord, GridError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn find(db: &Database, original_unique_id: &str) -> Result<Option<DedupRecord>, GridError> {
    let original = original_unique_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DedupRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT original_unique_id, thumbnail_unique_id, owner_account, resource_id,
                        confirmed, status
                 FROM dedup_records WHERE original_unique_id = ?1",
                params![original],
                |row| {
                    Ok(DedupRecord {
                        original_unique_id: row.get(0)?,
                        thumbnail_unique_id: row.get(1)?,
                        owner_account: row.get(2)?,
                        resource_id: row.get(3)?,
                        confirmed: row.get(4)?,
                        status: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert(db: &Database, record: &DedupRecord) -> Result<(), GridError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO dedup_records (original_unique_id, thumbnail_unique_id,
                                            owner_account, resource_id, confirmed, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (original_unique_id) DO UPDATE SET
                     thumbnail_unique_id = excluded.thumbnail_unique_id,
                     owner_account = excluded.owner_account,
                     resource_id = excluded.resource_id,
                     confirmed = excluded.confirmed,
                     status = excluded.status,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    record.original_unique_id,
                    record.thumbnail_unique_id,
                    record.owner_account,
                    record.resource_id,
                    record.confirmed,
                    record.status,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
